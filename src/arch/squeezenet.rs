/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : SqueezeNet v1.0 / v1.1。无归一化，全靠 fire 模块堆叠；
 *                 v1.1 把两次池化提前，计算量更小。
 *                 分类头是 conv1x1(1000) 接全局平均池化。
 */

use super::{image_input, BuiltNet, NUM_CLASSES};
use crate::nn::blocks::{conv_block, fire_module, Composer, NormForm, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, LossKind, NodeId};

fn family_style(style: &Style) -> Style {
    style
        .clone()
        .with_activation(ActivationKind::Relu)
        .with_norm(NormForm::None)
}

/// conv(64, 7x7, s2) -> maxpool3x3/s2/p1
fn stem(c: &mut Composer, input: NodeId, style: &Style) -> Result<NodeId, GraphError> {
    let x = conv_block(c, input, 64, (7, 7), (2, 2), (3, 3), style)?;
    c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)
}

/// 失活 -> conv1x1(1000) -> act -> gap -> 损失
fn head(c: &mut Composer, backbone: NodeId, style: &Style) -> Result<NodeId, GraphError> {
    let dropped = style.dropout(c, backbone)?;
    let logits = conv_block(c, dropped, NUM_CLASSES, (1, 1), (1, 1), (0, 0), style)?;
    let pooled = c.graph().new_global_avg_pool_node(logits, None)?;
    c.graph()
        .new_loss_node(&[pooled], LossKind::MulticlassLog, None)
}

pub fn squeezenet1_0(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = family_style(style);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = stem(c, input, &style)?;
    x = fire_module(c, x, 16, 64, 64, &style)?;
    x = fire_module(c, x, 16, 64, 64, &style)?;
    x = fire_module(c, x, 32, 128, 128, &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = fire_module(c, x, 32, 128, 128, &style)?;
    x = fire_module(c, x, 48, 192, 192, &style)?;
    x = fire_module(c, x, 48, 192, 192, &style)?;
    x = fire_module(c, x, 64, 256, 256, &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = fire_module(c, x, 64, 256, 256, &style)?;

    let output = head(c, x, &style)?;
    Ok(BuiltNet { input, output })
}

pub fn squeezenet1_1(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = family_style(style);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = stem(c, input, &style)?;
    x = fire_module(c, x, 16, 64, 64, &style)?;
    x = fire_module(c, x, 16, 64, 64, &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = fire_module(c, x, 32, 128, 128, &style)?;
    x = fire_module(c, x, 32, 128, 128, &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = fire_module(c, x, 48, 192, 192, &style)?;
    x = fire_module(c, x, 48, 192, 192, &style)?;
    x = fire_module(c, x, 64, 256, 256, &style)?;
    x = fire_module(c, x, 64, 256, 256, &style)?;

    let output = head(c, x, &style)?;
    Ok(BuiltNet { input, output })
}
