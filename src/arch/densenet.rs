/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : DenseNet 121/169/201/264，增长率统一 32。四段密集块，
 *                 段间过渡层把通道收束到 128/256/512；骨干末尾补一次
 *                 norm -> act。
 */

use super::{classification_head, image_input, BuiltNet};
use crate::nn::blocks::{conv_block, dense_layer, dense_transition, repeat, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError};

const GROWTH_RATE: usize = 32;

/// 各段密集层数（过渡层在段间，通道依次收束到 128/256/512）
fn build(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
    counts: [usize; 4],
) -> Result<BuiltNet, GraphError> {
    let style = style.clone().with_activation(ActivationKind::Relu);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    // conv(64,7x7,s2) -> norm -> act -> maxpool3x3/s2/p1
    let mut x = conv_block(c, input, 64, (7, 7), (2, 2), (3, 3), &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;

    for (stage, blocks) in counts.into_iter().enumerate() {
        x = repeat(c, x, blocks, |c, x| dense_layer(c, x, GROWTH_RATE, &style))?;
        if stage < 3 {
            x = dense_transition(c, x, 128 << stage, &style)?;
        }
    }
    x = style.norm(c, x)?;
    x = style.activation(c, x)?;

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}

pub fn densenet121(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [6, 12, 24, 16])
}

pub fn densenet169(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [6, 12, 32, 32])
}

pub fn densenet201(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [6, 12, 48, 32])
}

pub fn densenet264(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, [6, 12, 64, 48])
}
