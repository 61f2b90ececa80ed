/*
 * @Author       : 老董
 * @Date         : 2026-05-13
 * @Description  : YOLOv5 n/s/m/l/x。骨干为 CSP 段加 SPPF，颈部是上采样
 *                 与下采样双向融合（PAN），三个尺度各出一个 sigmoid 检测头，
 *                 汇入同一个 Yolo 终端。宽度/深度按有理数整数缩放。
 */

use super::{image_input, BuiltNet};
use crate::nn::blocks::{conv_block, csp_block, sppf, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, LossKind, NodeId};

const LEAKY_SLOPE: f32 = 0.01;

/// (分子, 分母)，缩放按 n * num / den 整数运算
type Scale = (usize, usize);

/// 检测头：conv1x1(1) -> sigmoid
fn detection_tap(c: &mut Composer, input: NodeId) -> Result<NodeId, GraphError> {
    let logits = c
        .graph()
        .new_conv2d_node(input, 1, (1, 1), (1, 1), (0, 0), true, None)?;
    c.graph()
        .new_activation_node(logits, ActivationKind::Sigmoid, None)
}

fn build(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
    depth: Scale,
    width: Scale,
) -> Result<BuiltNet, GraphError> {
    let style = style
        .clone()
        .with_activation(ActivationKind::LeakyRelu(LEAKY_SLOPE));
    let nf = 64 * width.0 / width.1;
    let reps = |n: usize| n * depth.0 / depth.1;
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    c.scoped(|c| {
        // ========== 骨干 ==========
        let mut x = conv_block(c, input, nf, (6, 6), (2, 2), (2, 2), &style)?;
        x = conv_block(c, x, 2 * nf, (3, 3), (2, 2), (1, 1), &style)?;
        x = csp_block(c, x, 2 * nf, reps(3), true, &style)?;
        x = conv_block(c, x, 4 * nf, (3, 3), (2, 2), (1, 1), &style)?;
        x = csp_block(c, x, 4 * nf, reps(6), true, &style)?;
        c.bind("p3", x);
        x = conv_block(c, x, 8 * nf, (3, 3), (2, 2), (1, 1), &style)?;
        x = csp_block(c, x, 8 * nf, reps(9), true, &style)?;
        c.bind("p4", x);
        x = conv_block(c, x, 16 * nf, (3, 3), (2, 2), (1, 1), &style)?;
        x = csp_block(c, x, 16 * nf, reps(3), true, &style)?;
        let p5 = sppf(c, x, 16 * nf, &style)?;

        // ========== 颈部：自顶向下 ==========
        let route5 = conv_block(c, p5, 8 * nf, (1, 1), (1, 1), (0, 0), &style)?;
        c.bind("route5", route5);
        let up5 = c.graph().new_upsample_node(route5, 2, None)?;
        let p4_src = c.resolve("p4")?;
        let mut merged = c.graph().new_concat_node(&[up5, p4_src], None)?;
        merged = csp_block(c, merged, 8 * nf, reps(3), false, &style)?;
        let route4 = conv_block(c, merged, 4 * nf, (1, 1), (1, 1), (0, 0), &style)?;
        c.bind("route4", route4);
        let up4 = c.graph().new_upsample_node(route4, 2, None)?;
        let p3_src = c.resolve("p3")?;
        merged = c.graph().new_concat_node(&[up4, p3_src], None)?;
        let out3 = csp_block(c, merged, 4 * nf, reps(3), false, &style)?;
        let tap3 = detection_tap(c, out3)?;

        // ========== 颈部：自底向上 ==========
        let down3 = conv_block(c, out3, 4 * nf, (3, 3), (2, 2), (1, 1), &style)?;
        let route4_src = c.resolve("route4")?;
        merged = c.graph().new_concat_node(&[down3, route4_src], None)?;
        let out4 = csp_block(c, merged, 8 * nf, reps(3), false, &style)?;
        let tap4 = detection_tap(c, out4)?;

        let down4 = conv_block(c, out4, 8 * nf, (3, 3), (2, 2), (1, 1), &style)?;
        let route5_src = c.resolve("route5")?;
        merged = c.graph().new_concat_node(&[down4, route5_src], None)?;
        let out5 = csp_block(c, merged, 16 * nf, reps(3), false, &style)?;
        let tap5 = detection_tap(c, out5)?;

        let output = c
            .graph()
            .new_loss_node(&[tap3, tap4, tap5], LossKind::Yolo, None)?;
        Ok(BuiltNet { input, output })
    })
}

pub fn yolov5n(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (1, 3), (1, 4))
}

pub fn yolov5s(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (1, 3), (1, 2))
}

pub fn yolov5m(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (2, 3), (3, 4))
}

pub fn yolov5l(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (1, 1), (1, 1))
}

pub fn yolov5x(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    build(graph, batch_size, image_size, style, (4, 3), (5, 4))
}
