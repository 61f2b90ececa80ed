/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : VoVNet 19s/19/39/57/99。三层或五层 OSA 模块分四段堆叠，
 *                 深网在后两段追加带恒等跳连的 OSA 重复。
 */

use super::{classification_head, image_input, BuiltNet};
use crate::nn::blocks::{conv_block, osa_module, repeat, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, NodeId};

/// 段表：(每层滤波器数, 输出滤波器数, 恒等跳连重复数)
type Stage = (usize, usize, usize);

/// conv3(64,s2) -> conv3(64,s1) -> conv3(128,s2)
fn stem(c: &mut Composer, input: NodeId, style: &Style) -> Result<NodeId, GraphError> {
    let mut x = conv_block(c, input, 64, (3, 3), (2, 2), (1, 1), style)?;
    x = conv_block(c, x, 64, (3, 3), (1, 1), (1, 1), style)?;
    conv_block(c, x, 128, (3, 3), (2, 2), (1, 1), style)
}

fn build(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
    layers: usize,
    stages: [Stage; 4],
) -> Result<BuiltNet, GraphError> {
    let style = style.clone().with_activation(ActivationKind::Relu);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = stem(c, input, &style)?;
    for (stage, (conv_filters, out_filters, id_blocks)) in stages.into_iter().enumerate() {
        if stage > 0 {
            x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
        }
        x = osa_module(c, x, conv_filters, out_filters, layers, false, &style)?;
        x = repeat(c, x, id_blocks, |c, x| {
            osa_module(c, x, conv_filters, out_filters, layers, true, &style)
        })?;
    }

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}

pub fn vovnet19_slim(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let stages = [(64, 112, 0), (80, 256, 0), (96, 384, 0), (112, 512, 0)];
    build(graph, batch_size, image_size, style, 3, stages)
}

pub fn vovnet19(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let stages = [(128, 256, 0), (160, 512, 0), (192, 768, 0), (224, 1024, 0)];
    build(graph, batch_size, image_size, style, 3, stages)
}

pub fn vovnet39(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let stages = [(128, 256, 0), (160, 512, 0), (192, 768, 1), (224, 1024, 1)];
    build(graph, batch_size, image_size, style, 5, stages)
}

pub fn vovnet57(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let stages = [(128, 256, 0), (160, 512, 0), (192, 768, 3), (224, 1024, 2)];
    build(graph, batch_size, image_size, style, 5, stages)
}

pub fn vovnet99(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let stages = [(128, 256, 0), (160, 512, 2), (192, 768, 8), (224, 1024, 2)];
    build(graph, batch_size, image_size, style, 5, stages)
}
