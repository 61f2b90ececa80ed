/*
 * @Author       : 老董
 * @Date         : 2026-05-04
 * @Description  : 多分支聚合母题：fire / inception / dense / OSA / CSP / SPPF。
 *                 同一输入扇出成若干分支，各分支末端按声明顺序绑定标签，
 *                 拼接节点严格按该顺序消费标签，再以 1x1 卷积收束通道。
 */

use super::{channels_of, conv_block, ensure_positive, Composer, Style};
use crate::nn::nodes::{ActivationKind, NodeId};
use crate::nn::GraphError;

// ========== SqueezeNet ==========

/// Fire 模块：conv1x1 压缩后扇出两路膨胀（1x1 与 3x3），
/// 按 [1x1 路, 3x3 路] 顺序拼接。
pub fn fire_module(
    c: &mut Composer,
    input: NodeId,
    squeeze_filters: usize,
    expand_1x1_filters: usize,
    expand_3x3_filters: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(squeeze_filters, "fire 模块的压缩滤波器数")?;
    ensure_positive(expand_1x1_filters, "fire 模块的 1x1 膨胀滤波器数")?;
    ensure_positive(expand_3x3_filters, "fire 模块的 3x3 膨胀滤波器数")?;

    c.scoped(|c| {
        let squeezed = conv_block(c, input, squeeze_filters, (1, 1), (1, 1), (0, 0), style)?;
        c.bind("fire_squeeze", squeezed);

        let b1 = conv_block(c, squeezed, expand_1x1_filters, (1, 1), (1, 1), (0, 0), style)?;
        c.bind("fire_e1", b1);
        let fan_src = c.resolve("fire_squeeze")?;
        let b3 = conv_block(c, fan_src, expand_3x3_filters, (3, 3), (1, 1), (1, 1), style)?;
        c.bind("fire_e3", b3);

        let parts = [c.resolve("fire_e1")?, c.resolve("fire_e3")?];
        c.graph().new_concat_node(&parts, None)
    })
}

// ========== GoogLeNet ==========

/// Inception 块：同一输入扇出四路，按声明顺序拼接。
/// 1 路：conv1x1；2 路：conv1x1 降维接 conv3x3；
/// 3 路：conv1x1 降维接 conv3x3（经典 5x5 分支的 3x3 版）；
/// 4 路：maxpool3x3/s1 接 conv3x3。
#[allow(clippy::too_many_arguments)]
pub fn inception_block(
    c: &mut Composer,
    input: NodeId,
    filters_1x1: usize,
    filters_3x3: usize,
    reduce_3x3: usize,
    filters_5x5: usize,
    reduce_5x5: usize,
    filters_pool: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    for (value, what) in [
        (filters_1x1, "inception 块 1x1 路的滤波器数"),
        (filters_3x3, "inception 块 3x3 路的滤波器数"),
        (reduce_3x3, "inception 块 3x3 路的降维数"),
        (filters_5x5, "inception 块 5x5 路的滤波器数"),
        (reduce_5x5, "inception 块 5x5 路的降维数"),
        (filters_pool, "inception 块池化路的滤波器数"),
    ] {
        ensure_positive(value, what)?;
    }

    c.scoped(|c| {
        c.bind("inception_in", input);

        let b1 = conv_block(c, input, filters_1x1, (1, 1), (1, 1), (0, 0), style)?;
        c.bind("inception_b1", b1);

        let fan_src = c.resolve("inception_in")?;
        let reduced = conv_block(c, fan_src, reduce_3x3, (1, 1), (1, 1), (0, 0), style)?;
        let b2 = conv_block(c, reduced, filters_3x3, (3, 3), (1, 1), (1, 1), style)?;
        c.bind("inception_b2", b2);

        let fan_src = c.resolve("inception_in")?;
        let reduced = conv_block(c, fan_src, reduce_5x5, (1, 1), (1, 1), (0, 0), style)?;
        let b3 = conv_block(c, reduced, filters_5x5, (3, 3), (1, 1), (1, 1), style)?;
        c.bind("inception_b3", b3);

        let fan_src = c.resolve("inception_in")?;
        let pooled = c
            .graph()
            .new_max_pool2d_node(fan_src, (3, 3), (1, 1), (1, 1), None)?;
        let b4 = conv_block(c, pooled, filters_pool, (3, 3), (1, 1), (1, 1), style)?;
        c.bind("inception_b4", b4);

        let parts = [
            c.resolve("inception_b1")?,
            c.resolve("inception_b2")?,
            c.resolve("inception_b3")?,
            c.resolve("inception_b4")?,
        ];
        c.graph().new_concat_node(&parts, None)
    })
}

// ========== DenseNet ==========

/// 密集层：norm -> act -> conv1x1(4g) -> norm -> act -> conv3x3(g)，
/// 新特征与输入按 [输入, 新特征] 顺序拼接，输出通道增加 g。
/// 预激活排布下 conv3x3 直喂拼接，去重偏置时只有 conv1x1 会被去掉。
pub fn dense_layer(
    c: &mut Composer,
    input: NodeId,
    growth_rate: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(growth_rate, "密集层的增长率")?;

    c.scoped(|c| {
        c.bind("dense_in", input);

        let mut fresh = style.norm(c, input)?;
        fresh = style.activation(c, fresh)?;
        fresh = c
            .graph()
            .new_conv2d_node(fresh, 4 * growth_rate, (1, 1), (1, 1), (0, 0), true, None)?;
        fresh = style.norm(c, fresh)?;
        fresh = style.activation(c, fresh)?;
        fresh = c
            .graph()
            .new_conv2d_node(fresh, growth_rate, (3, 3), (1, 1), (1, 1), true, None)?;

        let parts = [c.resolve("dense_in")?, fresh];
        c.graph().new_concat_node(&parts, None)
    })
}

/// 密集过渡层：norm -> act -> conv1x1(f) -> avg_pool2x2/s2，
/// 通道收束、空间减半。
pub fn dense_transition(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "密集过渡层的滤波器数")?;

    let mut out = style.norm(c, input)?;
    out = style.activation(c, out)?;
    out = c
        .graph()
        .new_conv2d_node(out, filters, (1, 1), (1, 1), (0, 0), true, None)?;
    c.graph().new_avg_pool2d_node(out, (2, 2), (2, 2), (0, 0), None)
}

// ========== VoVNet ==========

/// OSA 模块：layers 个 conv3x3 串联，各层输出连同输入一次性聚合
/// （拼接顺序 [输入, 第 1 层, ..., 第 N 层]），conv1x1 收束到 out_filters，
/// 再过 eSE 通道门控（gap -> 带偏置 conv1x1 -> sigmoid -> 逐通道缩放）。
/// identity = true 时整个模块外再套恒等跳连（要求输入通道等于 out_filters）。
pub fn osa_module(
    c: &mut Composer,
    input: NodeId,
    conv_filters: usize,
    out_filters: usize,
    layers: usize,
    identity: bool,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(conv_filters, "OSA 模块的每层滤波器数")?;
    ensure_positive(out_filters, "OSA 模块的输出滤波器数")?;
    ensure_positive(layers, "OSA 模块的层数")?;
    if identity {
        let in_channels = channels_of(c, input)?;
        if in_channels != out_filters {
            return Err(GraphError::InvalidConfiguration(format!(
                "OSA 模块的恒等跳连要求输入通道等于输出通道，实际{in_channels}->{out_filters}"
            )));
        }
    }

    c.scoped(|c| {
        c.bind("osa_tap0", input);
        let mut cursor = input;
        for i in 1..=layers {
            cursor = conv_block(c, cursor, conv_filters, (3, 3), (1, 1), (1, 1), style)?;
            c.bind(&format!("osa_tap{i}"), cursor);
        }

        let mut parts = Vec::with_capacity(layers + 1);
        for i in 0..=layers {
            parts.push(c.resolve(&format!("osa_tap{i}"))?);
        }
        let merged = c.graph().new_concat_node(&parts, None)?;
        let projected = conv_block(c, merged, out_filters, (1, 1), (1, 1), (0, 0), style)?;

        // eSE 门控：门控卷积带偏置且不接归一化
        let pooled = c.graph().new_global_avg_pool_node(projected, None)?;
        let gate = c
            .graph()
            .new_conv2d_node(pooled, out_filters, (1, 1), (1, 1), (0, 0), true, None)?;
        let gate = c
            .graph()
            .new_activation_node(gate, ActivationKind::Sigmoid, None)?;
        let gated = c.graph().new_multiply_node(projected, gate, None)?;

        if identity {
            let skip = c.resolve("osa_tap0")?;
            c.graph().new_add_node(&[gated, skip], None)
        } else {
            Ok(gated)
        }
    })
}

// ========== YOLO 系 ==========

/// CSP 瓶颈块：主路 conv1x1(f/2) 接 repeats 个瓶颈单元，
/// 旁路 conv1x1(f/2) 直连，按 [主路, 旁路] 顺序拼接后 conv1x1(f) 收束。
/// shortcut = true 时瓶颈单元内部带恒等跳连。
pub fn csp_block(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    repeats: usize,
    shortcut: bool,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "CSP 块的滤波器数")?;
    if filters % 2 != 0 {
        return Err(GraphError::InvalidConfiguration(format!(
            "CSP 块的滤波器数必须为偶数，实际{filters}"
        )));
    }
    let half = filters / 2;

    c.scoped(|c| {
        c.bind("csp_in", input);

        let entry = conv_block(c, input, half, (1, 1), (1, 1), (0, 0), style)?;
        let main = super::repeat(c, entry, repeats, |c, x| {
            yolo_bottleneck(c, x, half, shortcut, style)
        })?;
        c.bind("csp_main", main);

        let fan_src = c.resolve("csp_in")?;
        let bypass = conv_block(c, fan_src, half, (1, 1), (1, 1), (0, 0), style)?;
        c.bind("csp_bypass", bypass);

        let parts = [c.resolve("csp_main")?, c.resolve("csp_bypass")?];
        let merged = c.graph().new_concat_node(&parts, None)?;
        conv_block(c, merged, filters, (1, 1), (1, 1), (0, 0), style)
    })
}

/// CSP 主路的瓶颈单元：conv1x1(f) -> conv3x3(f)，
/// shortcut = true 时与单元输入相加，相加后不再激活。
fn yolo_bottleneck(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    shortcut: bool,
    style: &Style,
) -> Result<NodeId, GraphError> {
    c.scoped(|c| {
        c.bind("neck_in", input);

        let mut out = conv_block(c, input, filters, (1, 1), (1, 1), (0, 0), style)?;
        out = conv_block(c, out, filters, (3, 3), (1, 1), (1, 1), style)?;

        if shortcut {
            let skip = c.resolve("neck_in")?;
            c.graph().new_add_node(&[out, skip], None)
        } else {
            Ok(out)
        }
    })
}

/// SPPF 空间金字塔池化：conv1x1(f/2) 后串联三次 maxpool5x5/s1/p2，
/// 四个尺度按 [原路, 一池, 二池, 三池] 顺序拼接，再 conv1x1(f) 收束。
pub fn sppf(
    c: &mut Composer,
    input: NodeId,
    filters: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(filters, "SPPF 块的滤波器数")?;
    if filters % 2 != 0 {
        return Err(GraphError::InvalidConfiguration(format!(
            "SPPF 块的滤波器数必须为偶数，实际{filters}"
        )));
    }

    c.scoped(|c| {
        let base = conv_block(c, input, filters / 2, (1, 1), (1, 1), (0, 0), style)?;
        c.bind("sppf_base", base);
        let p1 = c.graph().new_max_pool2d_node(base, (5, 5), (1, 1), (2, 2), None)?;
        c.bind("sppf_pool1", p1);
        let p2 = c.graph().new_max_pool2d_node(p1, (5, 5), (1, 1), (2, 2), None)?;
        c.bind("sppf_pool2", p2);
        let p3 = c.graph().new_max_pool2d_node(p2, (5, 5), (1, 1), (2, 2), None)?;
        c.bind("sppf_pool3", p3);

        let parts = [
            c.resolve("sppf_base")?,
            c.resolve("sppf_pool1")?,
            c.resolve("sppf_pool2")?,
            c.resolve("sppf_pool3")?,
        ];
        let merged = c.graph().new_concat_node(&parts, None)?;
        conv_block(c, merged, filters, (1, 1), (1, 1), (0, 0), style)
    })
}
