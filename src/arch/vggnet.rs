/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : VGGNet 11/13/16/19。五段 conv3x3 堆叠，每段后接 2x2 池化，
 *                 末两段宽度同为 512；全连接头里失活在激活之后。
 */

use super::{image_input, BuiltNet, NUM_CLASSES};
use crate::nn::blocks::{conv_block, repeat, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, LossKind};

/// 每段的 (宽度, 块数)，末段宽度 512 出现两次
fn build(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
    counts: [usize; 4],
) -> Result<BuiltNet, GraphError> {
    let style = style.clone().with_activation(ActivationKind::Relu);
    let [nb_64, nb_128, nb_256, nb_512] = counts;
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = input;
    for (filters, blocks) in [
        (64, nb_64),
        (128, nb_128),
        (256, nb_256),
        (512, nb_512),
        (512, nb_512),
    ] {
        x = repeat(c, x, blocks, |c, x| {
            conv_block(c, x, filters, (3, 3), (1, 1), (1, 1), &style)
        })?;
        x = c.graph().new_max_pool2d_node(x, (2, 2), (2, 2), (0, 0), None)?;
    }

    // 全连接头：失活在激活之后
    x = c.graph().new_fully_connected_node(x, 4096, true, None)?;
    x = style.activation(c, x)?;
    x = style.dropout(c, x)?;
    x = c.graph().new_fully_connected_node(x, 4096, true, None)?;
    x = style.activation(c, x)?;
    x = style.dropout(c, x)?;
    let logits = c
        .graph()
        .new_fully_connected_node(x, NUM_CLASSES, true, None)?;
    let output = c
        .graph()
        .new_loss_node(&[logits], LossKind::MulticlassLog, None)?;

    Ok(BuiltNet { input, output })
}

pub fn vggnet11(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [1, 1, 2, 2])
}

pub fn vggnet13(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [2, 2, 2, 2])
}

pub fn vggnet16(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [2, 2, 3, 3])
}

pub fn vggnet19(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [2, 2, 4, 4])
}
