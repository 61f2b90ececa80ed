/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : RepVGG A0-A2 / B0-B3。宽度由 a、b 两个有理数缩放，
 *                 五段全部以步长 2 进入。带归一化的风格走多分支训练形态；
 *                 无归一化的风格走重参数化后的单路 conv3x3 部署形态。
 */

use super::{classification_head, image_input, BuiltNet};
use crate::nn::blocks::{conv_block, repeat, repvgg_block, Composer, NormForm, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, NodeId};

/// 有理数宽度：filters * num / den，整数运算
type Scale = (usize, usize);

fn scaled(filters: usize, (num, den): Scale) -> usize {
    filters * num / den
}

/// 段入口块：步长 2，不带恒等分支
fn entry(
    c: &mut Composer,
    x: NodeId,
    filters: usize,
    plain: bool,
    style: &Style,
) -> Result<NodeId, GraphError> {
    if plain {
        conv_block(c, x, filters, (3, 3), (2, 2), (1, 1), style)
    } else {
        let block = repvgg_block(c, x, filters, 2, false, style)?;
        style.activation(c, block)
    }
}

/// 段内重复块：步长 1，多分支形态带恒等分支
fn unit(
    c: &mut Composer,
    x: NodeId,
    filters: usize,
    plain: bool,
    style: &Style,
) -> Result<NodeId, GraphError> {
    if plain {
        conv_block(c, x, filters, (3, 3), (1, 1), (1, 1), style)
    } else {
        let block = repvgg_block(c, x, filters, 1, true, style)?;
        style.activation(c, block)
    }
}

/// (a, b, 各段重复数 [nb_1, nb_2, nb_3])
fn build(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
    a: Scale,
    b: Scale,
    counts: [usize; 3],
) -> Result<BuiltNet, GraphError> {
    let style = style.clone().with_activation(ActivationKind::Relu);
    let plain = style.norm_form() == NormForm::None;
    let widths = [
        scaled(64, a).min(64),
        scaled(64, a),
        scaled(128, a),
        scaled(256, a),
    ];
    let final_width = scaled(512, b);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = entry(c, input, widths[0], plain, &style)?;
    for (filters, blocks) in widths[1..].iter().copied().zip(counts) {
        x = entry(c, x, filters, plain, &style)?;
        x = repeat(c, x, blocks, |c, x| unit(c, x, filters, plain, &style))?;
    }
    x = entry(c, x, final_width, plain, &style)?;

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}

pub fn repvgg_a0(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (3, 4), (5, 2), [1, 3, 13])
}

pub fn repvgg_a1(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (1, 1), (5, 2), [1, 3, 13])
}

pub fn repvgg_a2(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (3, 2), (11, 4), [1, 3, 13])
}

pub fn repvgg_b0(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (1, 1), (5, 2), [3, 5, 15])
}

pub fn repvgg_b1(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (2, 1), (4, 1), [3, 5, 15])
}

pub fn repvgg_b2(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (5, 2), (5, 1), [3, 5, 15])
}

/// b3 的宽度随形态变化：多分支形态 a = 5/2，部署形态 a = 3
pub fn repvgg_b3(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let a = if style.norm_form() == NormForm::None {
        (3, 1)
    } else {
        (5, 2)
    };
    build(graph, batch_size, image_size, style, a, (5, 1), [3, 5, 15])
}
