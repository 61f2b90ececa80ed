/*
 * @Author       : 老董
 * @Description  : 注意力母题单元测试
 *
 * 测试策略：
 * 1. 词元嵌入与多头自注意力的形状契约和节点构成
 * 2. 头数整除与维度前提校验
 * 3. transformer 块小规模前向冒烟（推理形态下应当确定性）
 */

use crate::assert_err;
use crate::nn::blocks::{
    feed_forward, multihead_attention, token_embeddings, transformer_block, Composer, Style,
};
use crate::nn::{ActivationKind, Graph, GraphError};
use crate::tensor::Tensor;

// ==================== 词元嵌入 ====================

#[test]
fn test_token_embeddings_shape() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let tokens = graph.new_input_node(&[1, 5], Some("tokens"))?;
    let c = &mut Composer::new(&mut graph);
    let out = token_embeddings(c, tokens, 100, 16, 8)?;

    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 5, 16]);
    assert_eq!(graph.get_node(out)?.type_name(), "positional_encoding");
    // 位置编码表是常量，可训练参数只有嵌入矩阵
    assert_eq!(graph.params_count(), 100 * 16);
    Ok(())
}

#[test]
fn test_token_embeddings_rejects_zero_seq_cap() {
    let mut graph = Graph::new();
    let tokens = graph.new_input_node(&[1, 5], Some("tokens")).unwrap();
    let c = &mut Composer::new(&mut graph);
    let bad = token_embeddings(c, tokens, 100, 16, 0);
    assert_err!(
        bad,
        GraphError::InvalidConfiguration("位置编码的最大序列长必须为正")
    );
}

// ==================== 多头自注意力 ====================

#[test]
fn test_multihead_attention_structure() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 5, 16], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = multihead_attention(c, input, 4, &Style::infer())?;

    // 残差相加，形状保持
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 5, 16]);
    assert_eq!(graph.get_node(out)?.type_name(), "add");
    assert!(graph.get_node_parents(out)?.contains(&input));

    // q/k/v 一次性投影后按偏移抽取
    assert_eq!(graph.count_nodes(|n| n.type_name() == "extract"), 3);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "fully_connected"), 1);
    // 打分与加权求和两次矩阵乘
    assert_eq!(graph.count_nodes(|n| n.type_name() == "mat_mul"), 2);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "tril_mask"), 1);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "softmax"), 1);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "rms_norm"), 1);
    // 三路切头 + 一次合头
    assert_eq!(graph.count_nodes(|n| n.type_name() == "reshape"), 4);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "permute"), 4);
    // 推理形态下 1/√d_k 缩放与两处失活都是定值缩放
    assert_eq!(graph.count_nodes(|n| n.type_name() == "scale_const"), 3);

    // 参数只有 rms 的逐维增益和无偏置投影
    assert_eq!(graph.params_count(), 16 + 16 * 48);
    Ok(())
}

#[test]
fn test_multihead_attention_rejects_bad_heads() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 4, 10], Some("x")).unwrap();

    let c = &mut Composer::new(&mut graph);
    let bad = multihead_attention(c, input, 3, &Style::infer());
    assert_err!(
        bad,
        GraphError::InvalidConfiguration("注意力头数必须整除特征维，实际10 % 3 != 0")
    );

    let c = &mut Composer::new(&mut graph);
    let zero = multihead_attention(c, input, 0, &Style::infer());
    assert_err!(zero, GraphError::InvalidConfiguration("注意力头数必须为正"));
}

#[test]
fn test_multihead_attention_requires_3d() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 16, 4, 4], Some("x")).unwrap();
    let c = &mut Composer::new(&mut graph);
    let bad = multihead_attention(c, input, 4, &Style::infer());
    assert_err!(bad, GraphError::ShapeMismatch { .. });
}

// ==================== 前馈 ====================

#[test]
fn test_feed_forward_structure() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 4, 16], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = feed_forward(c, input, &Style::infer())?;

    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 4, 16]);
    assert_eq!(graph.get_node(out)?.type_name(), "add");
    assert_eq!(graph.count_nodes(|n| n.type_name() == "fully_connected"), 2);

    // rms 增益 16 + 带偏置的 16->64 与 64->16
    assert_eq!(graph.params_count(), 16 + (16 * 64 + 64) + (64 * 16 + 16));
    Ok(())
}

// ==================== transformer 块 ====================

#[test]
fn test_transformer_block_forward() -> Result<(), GraphError> {
    // 推理形态（定值缩放失活）下前向应当确定、有限
    let mut graph = Graph::new_with_seed(7);
    let input = graph.new_input_node(&[1, 4, 8], Some("x"))?;
    let style = Style::infer()
        .with_activation(ActivationKind::Gelu)
        .with_dropout_rate(0.1);
    let c = &mut Composer::new(&mut graph);
    let out = transformer_block(c, input, 2, &style)?;

    let data: Vec<f32> = (0..32).map(|i| 0.1 * i as f32 - 1.5).collect();
    graph.set_node_value(input, Tensor::new(&data, &[1, 4, 8]))?;
    graph.forward(out)?;

    let first = graph.get_node_value(out)?.unwrap().clone();
    assert_eq!(first.shape(), &[1, 4, 8]);
    assert!(first.data_as_slice().iter().all(|v| v.is_finite()));

    // 同一输入再跑一遍，逐元素一致
    graph.forward(out)?;
    let second = graph.get_node_value(out)?.unwrap();
    assert_eq!(&first, second);
    Ok(())
}
