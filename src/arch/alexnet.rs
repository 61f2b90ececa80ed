/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : AlexNet。无归一化的老式网络，卷积偏置全程保留；
 *                 两个 4096 全连接前各有一次随机失活。
 */

use super::{image_input, BuiltNet, NUM_CLASSES};
use crate::nn::blocks::{conv_block, Composer, NormForm, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, LossKind};

pub fn alexnet(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = style
        .clone()
        .with_activation(ActivationKind::Relu)
        .with_norm(NormForm::None);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = conv_block(c, input, 96, (11, 11), (4, 4), (2, 2), &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (0, 0), None)?;
    x = conv_block(c, x, 256, (5, 5), (1, 1), (2, 2), &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (0, 0), None)?;
    x = conv_block(c, x, 384, (3, 3), (1, 1), (1, 1), &style)?;
    x = conv_block(c, x, 384, (3, 3), (1, 1), (1, 1), &style)?;
    x = conv_block(c, x, 256, (3, 3), (1, 1), (1, 1), &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (0, 0), None)?;

    // 全连接头：失活在全连接之前
    x = style.dropout(c, x)?;
    x = c.graph().new_fully_connected_node(x, 4096, true, None)?;
    x = style.activation(c, x)?;
    x = style.dropout(c, x)?;
    x = c.graph().new_fully_connected_node(x, 4096, true, None)?;
    x = style.activation(c, x)?;
    let logits = c
        .graph()
        .new_fully_connected_node(x, NUM_CLASSES, true, None)?;
    let output = c
        .graph()
        .new_loss_node(&[logits], LossKind::MulticlassLog, None)?;

    Ok(BuiltNet { input, output })
}
