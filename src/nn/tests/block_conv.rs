/*
 * @Author       : 老董
 * @Description  : 卷积块与风格（Style）单元测试
 *
 * 测试策略：
 * 1. conv_block / conv_norm 在各归一化形态下的节点构成
 * 2. 风格派生（激活、归一化、失活率）
 * 3. 配置校验
 */

use crate::assert_err;
use crate::nn::blocks::{conv_block, conv_norm, Composer, DropoutForm, NormForm, Style};
use crate::nn::{ActivationKind, Graph, GraphError};

#[test]
fn test_conv_block_batch_form() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 16, 16], Some("image"))?;
    let style = Style::train().with_activation(ActivationKind::Relu);

    let c = &mut Composer::new(&mut graph);
    let out = conv_block(c, input, 8, (3, 3), (2, 2), (1, 1), &style)?;

    // conv -> batch_norm -> relu
    assert_eq!(graph.nodes_count(), 4);
    assert_eq!(graph.get_node(out)?.type_name(), "relu");
    assert_eq!(graph.count_nodes(|n| n.type_name() == "batch_norm"), 1);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 8, 8, 8]);
    Ok(())
}

#[test]
fn test_conv_block_affine_form() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 16, 16], Some("image"))?;
    let style = Style::infer().with_activation(ActivationKind::Relu);

    let c = &mut Composer::new(&mut graph);
    let out = conv_block(c, input, 8, (3, 3), (1, 1), (1, 1), &style)?;

    // conv -> affine -> relu
    assert_eq!(graph.nodes_count(), 4);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "affine"), 1);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "batch_norm"), 0);
    assert_eq!(graph.get_node(out)?.type_name(), "relu");
    Ok(())
}

#[test]
fn test_conv_block_none_form_skips_norm() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 16, 16], Some("image"))?;
    let style = Style::infer()
        .with_activation(ActivationKind::Relu)
        .with_norm(NormForm::None);

    let c = &mut Composer::new(&mut graph);
    let out = conv_block(c, input, 8, (3, 3), (1, 1), (1, 1), &style)?;

    // conv -> relu，无归一化
    assert_eq!(graph.nodes_count(), 3);
    assert_eq!(graph.count_nodes(|n| n.is_normalization()), 0);
    assert_eq!(graph.get_node(out)?.type_name(), "relu");
    Ok(())
}

#[test]
fn test_conv_norm_has_no_activation() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 16, 16], Some("image"))?;
    let style = Style::infer().with_activation(ActivationKind::Relu);

    let c = &mut Composer::new(&mut graph);
    let out = conv_norm(c, input, 8, (1, 1), (1, 1), (0, 0), &style)?;

    // conv -> affine，激活留给调用方
    assert_eq!(graph.nodes_count(), 3);
    assert_eq!(graph.get_node(out)?.type_name(), "affine");
    assert_eq!(graph.count_nodes(|n| n.type_name() == "relu"), 0);
    Ok(())
}

#[test]
fn test_conv_block_rejects_zero_filters() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 16, 16], Some("image")).unwrap();
    let style = Style::infer().with_activation(ActivationKind::Relu);

    let c = &mut Composer::new(&mut graph);
    let bad = conv_block(c, input, 0, (3, 3), (1, 1), (1, 1), &style);
    assert_err!(
        bad,
        GraphError::InvalidConfiguration("卷积块的滤波器数必须为正")
    );
}

// ==================== 风格 ====================

#[test]
fn test_style_presets() {
    let train = Style::train();
    assert_eq!(train.norm_form(), NormForm::Batch);
    assert!(matches!(train.dropout_form(), DropoutForm::Random(r) if (r - 0.5).abs() < 1e-6));

    let infer = Style::infer();
    assert_eq!(infer.norm_form(), NormForm::Affine);
    assert!(matches!(infer.dropout_form(), DropoutForm::Scale(s) if (s - 0.5).abs() < 1e-6));
}

#[test]
fn test_style_with_dropout_rate() {
    // 部署形态下失活率换算成保留率的常数缩放
    let style = Style::infer().with_dropout_rate(0.1);
    assert!(matches!(style.dropout_form(), DropoutForm::Scale(s) if (s - 0.9).abs() < 1e-6));

    let train = Style::train().with_dropout_rate(0.1);
    assert!(matches!(train.dropout_form(), DropoutForm::Random(r) if (r - 0.1).abs() < 1e-6));
}

#[test]
fn test_style_norm_none_returns_input() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 16, 16], Some("image"))?;
    let style = Style::infer().with_norm(NormForm::None);

    let c = &mut Composer::new(&mut graph);
    let out = style.norm(c, input)?;
    assert_eq!(out, input);
    assert_eq!(graph.nodes_count(), 1);
    Ok(())
}

#[test]
fn test_style_dropout_forms() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 8], Some("x"))?;

    // 训练形态落随机失活节点
    let c = &mut Composer::new(&mut graph);
    let random = Style::train().dropout(c, input)?;
    assert_eq!(graph.get_node(random)?.type_name(), "dropout");

    // 部署形态落常数缩放节点
    let c = &mut Composer::new(&mut graph);
    let scaled = Style::infer().dropout(c, input)?;
    assert_eq!(graph.get_node(scaled)?.type_name(), "scale_const");
    Ok(())
}
