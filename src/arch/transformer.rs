/*
 * @Author       : 老董
 * @Date         : 2026-05-13
 * @Description  : 自回归小语言模型（vslm）。词元嵌入叠正弦位置编码，
 *                 N 个 transformer 块后接收束分类头；激活钉死为 gelu，
 *                 失活率 10%。
 */

use super::BuiltNet;
use crate::nn::blocks::{ensure_positive, token_embeddings, transformer_block, Composer, Style};
use crate::nn::ActivationKind;
use crate::nn::{Graph, GraphError, LossKind};

/// transformer 语言模型的结构参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerConfig {
    pub vocab_size: usize,
    pub num_layers: usize,
    pub num_heads: usize,
    pub embedding_dim: usize,
    pub max_seq_len: usize,
}

impl Default for TransformerConfig {
    /// vslm 默认配置：词表 2000、3 层、4 头、维 128、最长序列 80
    fn default() -> Self {
        Self {
            vocab_size: 2000,
            num_layers: 3,
            num_heads: 4,
            embedding_dim: 128,
            max_seq_len: 80,
        }
    }
}

pub fn transformer_lm(
    graph: &mut Graph,
    batch_size: usize,
    seq_len: usize,
    style: &Style,
    config: &TransformerConfig,
) -> Result<BuiltNet, GraphError> {
    ensure_positive(batch_size, "批量大小")?;
    ensure_positive(seq_len, "序列长")?;
    ensure_positive(config.num_layers, "transformer 层数")?;
    let style = style
        .clone()
        .with_activation(ActivationKind::Gelu)
        .with_dropout_rate(0.1);
    let dim = config.embedding_dim;

    let input = graph.new_input_node(&[batch_size, seq_len], Some("tokens"))?;
    let c = &mut Composer::new(graph);

    let embedded = token_embeddings(c, input, config.vocab_size, dim, config.max_seq_len)?;
    let encoded = crate::nn::blocks::repeat(c, embedded, config.num_layers, |c, x| {
        transformer_block(c, x, config.num_heads, &style)
    })?;

    // 收束分类头：norm -> fc(d/8) -> act -> fc(d/4) -> fc(词表)
    let mut x = c.graph().new_rms_norm_node(encoded, None)?;
    x = c.graph().new_fully_connected_node(x, dim / 8, true, None)?;
    x = style.activation(c, x)?;
    x = c.graph().new_fully_connected_node(x, dim / 4, true, None)?;
    let logits = c
        .graph()
        .new_fully_connected_node(x, config.vocab_size, true, None)?;
    let output = c
        .graph()
        .new_loss_node(&[logits], LossKind::MulticlassLog, None)?;

    Ok(BuiltNet { input, output })
}

/// 默认配置的 vslm，签名与图像网络目录一致
pub fn vslm(
    graph: &mut Graph,
    batch_size: usize,
    seq_len: usize,
    style: &Style,
) -> Result<BuiltNet, GraphError> {
    transformer_lm(graph, batch_size, seq_len, style, &TransformerConfig::default())
}
