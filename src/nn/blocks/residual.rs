/*
 * @Author       : 老董
 * @Date         : 2026-05-03
 * @Description  : 残差母题：basic / bottleneck / darknet / repvgg 四种。
 *                 输入先绑标签，主路建完后从标签解析回跳连；
 *                 主路改变形状时在跳连路上垫 1x1 投影（投影本身
 *                 也是卷积尾块，不搞特殊分支）。
 */

use super::{channels_of, conv_norm, ensure_positive, Composer, Style};
use crate::nn::nodes::NodeId;
use crate::nn::GraphError;

/// 基础残差块（ResNet-18/34）：
/// conv3x3(f, s) -> norm -> act -> conv3x3(f, 1) -> norm，与跳连相加后再激活。
/// 步长不为 1 或通道数改变时，跳连路插入 conv1x1(f, s) -> norm 投影。
pub fn residual_basic(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    stride: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "残差块的滤波器数")?;
    let in_channels = channels_of(c, input)?;

    c.scoped(|c| {
        c.bind("res_in", input);

        let mut main = conv_norm(c, input, filters, (3, 3), (stride, stride), (1, 1), style)?;
        main = style.activation(c, main)?;
        main = conv_norm(c, main, filters, (3, 3), (1, 1), (1, 1), style)?;

        let skip_src = c.resolve("res_in")?;
        let skip = if stride != 1 || in_channels != filters {
            conv_norm(c, skip_src, filters, (1, 1), (stride, stride), (0, 0), style)?
        } else {
            skip_src
        };

        let sum = c.graph().new_add_node(&[main, skip], None)?;
        style.activation(c, sum)
    })
}

/// 瓶颈残差块（ResNet-50/101/152），输出通道为 4f：
/// conv1x1(f) -> conv3x3(f, s) -> conv1x1(4f)，各段 norm，末段不激活。
pub fn residual_bottleneck(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    stride: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "瓶颈残差块的滤波器数")?;
    let out_channels = filters * 4;
    let in_channels = channels_of(c, input)?;

    c.scoped(|c| {
        c.bind("res_in", input);

        let mut main = conv_norm(c, input, filters, (1, 1), (1, 1), (0, 0), style)?;
        main = style.activation(c, main)?;
        main = conv_norm(c, main, filters, (3, 3), (stride, stride), (1, 1), style)?;
        main = style.activation(c, main)?;
        main = conv_norm(c, main, out_channels, (1, 1), (1, 1), (0, 0), style)?;

        let skip_src = c.resolve("res_in")?;
        let skip = if stride != 1 || in_channels != out_channels {
            conv_norm(c, skip_src, out_channels, (1, 1), (stride, stride), (0, 0), style)?
        } else {
            skip_src
        };

        let sum = c.graph().new_add_node(&[main, skip], None)?;
        style.activation(c, sum)
    })
}

/// Darknet 残差块（Darknet-53）：
/// conv1x1(f/2) 块 -> conv3x3(f) 块，激活在各卷积块内部，相加后不再激活。
pub fn darknet_residual(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "darknet 残差块的滤波器数")?;
    if filters % 2 != 0 {
        return Err(GraphError::InvalidConfiguration(format!(
            "darknet 残差块的滤波器数必须为偶数，实际{filters}"
        )));
    }

    c.scoped(|c| {
        c.bind("res_in", input);

        let squeezed = super::conv_block(c, input, filters / 2, (1, 1), (1, 1), (0, 0), style)?;
        let expanded = super::conv_block(c, squeezed, filters, (3, 3), (1, 1), (1, 1), style)?;

        let skip = c.resolve("res_in")?;
        c.graph().new_add_node(&[expanded, skip], None)
    })
}

/// RepVGG 块（训练形态）：norm(conv3x3(f, s)) + norm(conv1x1(f, s)) 两分支
/// 求和；identity = true 时再加一路 norm(x)（要求通道数不变、步长为 1）。
/// 激活由调用方在块外面套。
pub fn repvgg_block(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    stride: usize,
    identity: bool,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "repvgg 块的滤波器数")?;
    if identity {
        let in_channels = channels_of(c, input)?;
        if stride != 1 || in_channels != filters {
            return Err(GraphError::InvalidConfiguration(format!(
                "repvgg 块的恒等分支要求步长为 1 且通道数不变，实际步长{stride}、{in_channels}->{filters}"
            )));
        }
    }

    c.scoped(|c| {
        c.bind("res_in", input);

        let dense = conv_norm(c, input, filters, (3, 3), (stride, stride), (1, 1), style)?;
        let skip_src = c.resolve("res_in")?;
        let pointwise = conv_norm(c, skip_src, filters, (1, 1), (stride, stride), (0, 0), style)?;

        let mut branches = vec![dense, pointwise];
        if identity {
            let id_branch = style.norm(c, skip_src)?;
            branches.push(id_branch);
        }
        c.graph().new_add_node(&branches, None)
    })
}
