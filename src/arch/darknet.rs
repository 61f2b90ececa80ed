/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : DarkNet 19/53 与 CSP 变体，激活钉死为 leaky_relu。
 *                 19 用池化降采样加 3x3/1x1 交替组；53 用 s2 卷积降采样
 *                 加残差；csp 变体把 53 各段残差堆叠换成 CSP 块。
 */

use super::{classification_head, image_input, BuiltNet};
use crate::nn::blocks::{conv_block, csp_block, darknet_residual, repeat, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, NodeId};

const LEAKY_SLOPE: f32 = 0.01;

fn family_style(style: &Style) -> Style {
    style
        .clone()
        .with_activation(ActivationKind::LeakyRelu(LEAKY_SLOPE))
}

/// 3x3(f) 与 1x1(f/2) 交替的卷积组，首尾都是 3x3
fn conv_group(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    convs: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    let mut x = input;
    for i in 0..convs {
        x = if i % 2 == 0 {
            conv_block(c, x, filters, (3, 3), (1, 1), (1, 1), style)?
        } else {
            conv_block(c, x, filters / 2, (1, 1), (1, 1), (0, 0), style)?
        };
    }
    Ok(x)
}

pub fn darknet19(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = family_style(style);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = conv_block(c, input, 32, (3, 3), (1, 1), (1, 1), &style)?;
    x = c.graph().new_max_pool2d_node(x, (2, 2), (2, 2), (0, 0), None)?;
    x = conv_block(c, x, 64, (3, 3), (1, 1), (1, 1), &style)?;
    x = c.graph().new_max_pool2d_node(x, (2, 2), (2, 2), (0, 0), None)?;
    x = conv_group(c, x, 128, 3, &style)?;
    x = c.graph().new_max_pool2d_node(x, (2, 2), (2, 2), (0, 0), None)?;
    x = conv_group(c, x, 256, 3, &style)?;
    x = c.graph().new_max_pool2d_node(x, (2, 2), (2, 2), (0, 0), None)?;
    x = conv_group(c, x, 512, 5, &style)?;
    x = c.graph().new_max_pool2d_node(x, (2, 2), (2, 2), (0, 0), None)?;
    x = conv_group(c, x, 1024, 5, &style)?;

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}

/// 53 与 csp 共用的段表：(段宽, 残差/CSP 重复数)
const STAGES_53: [(usize, usize); 5] = [(64, 1), (128, 2), (256, 8), (512, 8), (1024, 4)];

pub fn darknet53(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = family_style(style);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = conv_block(c, input, 32, (3, 3), (1, 1), (1, 1), &style)?;
    for (filters, blocks) in STAGES_53 {
        x = conv_block(c, x, filters, (3, 3), (2, 2), (1, 1), &style)?;
        x = repeat(c, x, blocks, |c, x| darknet_residual(c, x, filters, &style))?;
    }

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}

pub fn darknet53_csp(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = family_style(style);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = conv_block(c, input, 32, (3, 3), (1, 1), (1, 1), &style)?;
    for (filters, blocks) in STAGES_53 {
        x = conv_block(c, x, filters, (3, 3), (2, 2), (1, 1), &style)?;
        x = csp_block(c, x, filters, blocks, true, &style)?;
    }

    let output = classification_head(c, x)?;
    Ok(BuiltNet { input, output })
}
