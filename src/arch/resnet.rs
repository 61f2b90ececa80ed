/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : ResNet 18/34/50/101/152。首段不降采样，后三段首块步长 2；
 *                 跳连在形状改变处用 1x1 投影对齐（含瓶颈网首段的通道扩张）。
 */

use super::{classification_head, image_input, BuiltNet};
use crate::nn::blocks::{
    conv_block, repeat, residual_basic, residual_bottleneck, Composer, Style,
};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, NodeId};

/// 每段的残差块数，含首块（首段无降采样块）
fn build(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
    counts: [usize; 4],
    bottleneck: bool,
) -> Result<BuiltNet, GraphError> {
    let style = style.clone().with_activation(ActivationKind::Relu);
    let [nb_64, nb_128, nb_256, nb_512] = counts;
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    // conv(64,7x7,s2) -> maxpool3x3/s2（不补边）
    let mut x = conv_block(c, input, 64, (7, 7), (2, 2), (3, 3), &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (0, 0), None)?;

    let block = |c: &mut Composer, x: NodeId, filters: usize, stride: usize| {
        if bottleneck {
            residual_bottleneck(c, x, filters, stride, &style)
        } else {
            residual_basic(c, x, filters, stride, &style)
        }
    };

    x = repeat(c, x, nb_64, |c, x| block(c, x, 64, 1))?;
    for (filters, blocks) in [(128, nb_128), (256, nb_256), (512, nb_512)] {
        x = block(c, x, filters, 2)?;
        x = repeat(c, x, blocks - 1, |c, x| block(c, x, filters, 1))?;
    }

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}

pub fn resnet18(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [2, 2, 2, 2], false)
}

pub fn resnet34(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [3, 4, 6, 3], false)
}

pub fn resnet50(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [3, 4, 6, 3], true)
}

pub fn resnet101(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [3, 4, 23, 3], true)
}

pub fn resnet152(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [3, 8, 36, 3], true)
}
