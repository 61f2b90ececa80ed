/*
 * @Author       : 老董
 * @Date         : 2026-05-05
 * @Description  : 注意力母题：多头自注意力、前馈与 transformer 块。
 *                 q/k/v 由单个无偏置全连接一次性投影，再按头切分；
 *                 因果掩码在 softmax 之前置 -inf。残差相加后不激活。
 */

use super::{ensure_positive, token_dims_of, Composer, Style};
use crate::nn::nodes::{ActivationKind, NodeId};
use crate::nn::GraphError;

/// 多头自注意力块（预归一化）：
/// rms_norm -> fc_no_bias(3d) -> 按偏移 0/d/2d 抽取 q/k/v
/// -> 切头 [b, h, s, d_k] -> q·kᵀ/√d_k -> 因果掩码 -> softmax
/// -> 失活 -> ·v -> 合头 -> 失活 -> 与输入相加。
/// 注意：输出侧没有再投影，合头后直接走残差。
pub fn multihead_attention(
    c: &mut Composer,
    input: NodeId,
    num_heads: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    ensure_positive(num_heads, "注意力头数")?;
    let (seq_len, d_model) = token_dims_of(c, input)?;
    if d_model % num_heads != 0 {
        return Err(GraphError::InvalidConfiguration(format!(
            "注意力头数必须整除特征维，实际{d_model} % {num_heads} != 0"
        )));
    }
    let d_k = d_model / num_heads;

    c.scoped(|c| {
        c.bind("attn_in", input);

        let normed = c.graph().new_rms_norm_node(input, None)?;
        let qkv = c
            .graph()
            .new_fully_connected_node(normed, 3 * d_model, false, None)?;

        // 1. 按偏移抽取并切头
        let query = c.graph().new_extract_node(qkv, 0, d_model, None)?;
        let key = c.graph().new_extract_node(qkv, d_model, d_model, None)?;
        let value = c.graph().new_extract_node(qkv, 2 * d_model, d_model, None)?;

        let query = split_heads(c, query, seq_len, num_heads, d_k)?;
        let key = split_heads(c, key, seq_len, num_heads, d_k)?;
        let value = split_heads(c, value, seq_len, num_heads, d_k)?;

        // 2. 缩放点积 + 因果掩码
        let scores = c.graph().new_mat_mul_node(query, key, true, None)?;
        let scaled = c
            .graph()
            .new_scale_const_node(scores, 1.0 / (d_k as f32).sqrt(), None)?;
        let masked = c.graph().new_tril_mask_node(scaled, None)?;
        let weights = c
            .graph()
            .new_activation_node(masked, ActivationKind::Softmax, None)?;
        let weights = style.dropout(c, weights)?;

        // 3. 加权求和并合头
        let context = c.graph().new_mat_mul_node(weights, value, false, None)?;
        let merged = c.graph().new_permute_node(context, &[0, 2, 1, 3], None)?;
        let merged = c
            .graph()
            .new_reshape_node(merged, &[seq_len, d_model], None)?;
        let dropped = style.dropout(c, merged)?;

        let skip = c.resolve("attn_in")?;
        c.graph().new_add_node(&[dropped, skip], None)
    })
}

/// [b, s, d] -> [b, h, s, d_k]
fn split_heads(
    c: &mut Composer,
    input: NodeId,
    seq_len: usize,
    num_heads: usize,
    d_k: usize,
) -> Result<NodeId, GraphError> {
    let reshaped = c
        .graph()
        .new_reshape_node(input, &[seq_len, num_heads, d_k], None)?;
    c.graph().new_permute_node(reshaped, &[0, 2, 1, 3], None)
}

/// 前馈块（预归一化）：rms_norm -> fc(4d) -> act -> fc(d) -> 失活，
/// 与输入相加。两个全连接都带偏置。
pub fn feed_forward(
    c: &mut Composer,
    input: NodeId,
    style: &Style,
) -> Result<NodeId, GraphError> {
    let (_, d_model) = token_dims_of(c, input)?;

    c.scoped(|c| {
        c.bind("ffn_in", input);

        let normed = c.graph().new_rms_norm_node(input, None)?;
        let mut hidden = c
            .graph()
            .new_fully_connected_node(normed, 4 * d_model, true, None)?;
        hidden = style.activation(c, hidden)?;
        hidden = c
            .graph()
            .new_fully_connected_node(hidden, d_model, true, None)?;
        let dropped = style.dropout(c, hidden)?;

        let skip = c.resolve("ffn_in")?;
        c.graph().new_add_node(&[dropped, skip], None)
    })
}

/// Transformer 块：多头自注意力接前馈，各自带残差。
pub fn transformer_block(
    c: &mut Composer,
    input: NodeId,
    num_heads: usize,
    style: &Style,
) -> Result<NodeId, GraphError> {
    let attended = multihead_attention(c, input, num_heads, style)?;
    feed_forward(c, attended, style)
}

/// 词元嵌入：embedding 查表后叠加正弦位置编码，[b, s] -> [b, s, dim]。
pub fn token_embeddings(
    c: &mut Composer,
    input: NodeId,
    vocab_size: usize,
    dim: usize,
    max_seq_len: usize,
) -> Result<NodeId, GraphError> {
    ensure_positive(max_seq_len, "位置编码的最大序列长")?;
    let embedded = c.graph().new_embedding_node(input, vocab_size, dim, None)?;
    c.graph().new_positional_encoding_node(embedded, max_seq_len, None)
}
