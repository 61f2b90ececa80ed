/*
 * @Author       : 老董
 * @Date         : 2026-05-02
 * @Description  : 卷积母题：卷积 -> 归一化 -> 激活 的标准序列及其变体。
 *                 卷积一律先带偏置，推理前由去重偏置 pass 统一收掉。
 */

use super::{ensure_positive, Composer, Style};
use crate::nn::nodes::NodeId;
use crate::nn::GraphError;

/// 卷积块：conv -> norm -> act（归一化与激活按 Style 决定）
pub fn conv_block(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    kernel_size: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "卷积块的滤波器数")?;
    let conv = c
        .graph()
        .new_conv2d_node(input, filters, kernel_size, stride, padding, true, None)?;
    let normed = style.norm(c, conv)?;
    style.activation(c, normed)
}

/// 卷积尾块：conv -> norm，不带激活。
/// 残差主路的末端用它，激活留到相加之后。
pub fn conv_norm(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    kernel_size: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "卷积尾块的滤波器数")?;
    let conv = c
        .graph()
        .new_conv2d_node(input, filters, kernel_size, stride, padding, true, None)?;
    style.norm(c, conv)
}
