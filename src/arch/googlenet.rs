/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : GoogLeNet。九个 inception 块分三段堆叠，段间 3x3/s2 池化；
 *                 分类头在全局平均池化与全连接之间有一次随机失活。
 */

use super::{image_input, BuiltNet, NUM_CLASSES};
use crate::nn::blocks::{conv_block, inception_block, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, LossKind, NodeId};

/// conv(64,7x7,s2) -> maxpool -> conv(64,1x1) -> conv(192,3x3) -> maxpool
fn stem(c: &mut Composer, input: NodeId, style: &Style) -> Result<NodeId, GraphError> {
    let mut x = conv_block(c, input, 64, (7, 7), (2, 2), (3, 3), style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = conv_block(c, x, 64, (1, 1), (1, 1), (0, 0), style)?;
    x = conv_block(c, x, 192, (3, 3), (1, 1), (1, 1), style)?;
    c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)
}

pub fn googlenet(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    let style = style.clone().with_activation(ActivationKind::Relu);
    let input = image_input(graph, batch_size, image_size)?;
    let c = &mut Composer::new(graph);

    let mut x = stem(c, input, &style)?;
    // 各块参数：(1x1, 3x3, 3x3降维, 5x5, 5x5降维, 池化路)
    x = inception_block(c, x, 64, 128, 96, 32, 16, 32, &style)?;
    x = inception_block(c, x, 128, 192, 128, 96, 32, 64, &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = inception_block(c, x, 192, 208, 96, 48, 16, 64, &style)?;
    x = inception_block(c, x, 160, 224, 112, 64, 24, 64, &style)?;
    x = inception_block(c, x, 128, 256, 128, 64, 24, 64, &style)?;
    x = inception_block(c, x, 112, 288, 144, 64, 32, 64, &style)?;
    x = inception_block(c, x, 256, 320, 160, 128, 32, 128, &style)?;
    x = c.graph().new_max_pool2d_node(x, (3, 3), (2, 2), (1, 1), None)?;
    x = inception_block(c, x, 256, 320, 160, 128, 32, 128, &style)?;
    x = inception_block(c, x, 384, 384, 192, 128, 48, 128, &style)?;

    let pooled = c.graph().new_global_avg_pool_node(x, None)?;
    let dropped = style.dropout(c, pooled)?;
    let logits = c
        .graph()
        .new_fully_connected_node(dropped, NUM_CLASSES, true, None)?;
    let output = c
        .graph()
        .new_loss_node(&[logits], LossKind::MulticlassLog, None)?;

    Ok(BuiltNet { input, output })
}
