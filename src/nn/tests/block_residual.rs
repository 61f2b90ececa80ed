/*
 * @Author       : 老董
 * @Description  : 残差母题单元测试
 *
 * 测试策略：
 * 1. basic / bottleneck 的投影触发条件（步长、通道数）
 * 2. darknet 残差的形状约束（通道不变才可相加）
 * 3. repvgg 块的分支数与恒等分支前提
 */

use crate::assert_err;
use crate::nn::blocks::{
    darknet_residual, repvgg_block, residual_basic, residual_bottleneck, Composer, Style,
};
use crate::nn::{ActivationKind, Graph, GraphError};

fn infer_style() -> Style {
    Style::infer().with_activation(ActivationKind::Relu)
}

// ==================== basic ====================

#[test]
fn test_residual_basic_identity_skip() -> Result<(), GraphError> {
    // 同通道、步长 1：跳连直通，不投影
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 64, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = residual_basic(c, input, 64, 1, &infer_style())?;

    // conv+norm, act, conv+norm, add, act
    assert_eq!(graph.nodes_count(), 1 + 7);
    assert_eq!(graph.convolutions_count(), 2);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 64, 8, 8]);
    // 相加节点的第二路直接是输入
    let sum = graph.get_node_parents(out)?[0];
    assert!(graph.get_node_parents(sum)?.contains(&input));
    Ok(())
}

#[test]
fn test_residual_basic_projects_on_stride() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 64, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = residual_basic(c, input, 128, 2, &infer_style())?;

    // 跳连路多一个 conv1x1 投影（conv+norm）
    assert_eq!(graph.nodes_count(), 1 + 9);
    assert_eq!(graph.convolutions_count(), 3);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 128, 4, 4]);
    Ok(())
}

#[test]
fn test_residual_basic_projects_on_channel_change() -> Result<(), GraphError> {
    // 步长 1 但通道数改变，同样要投影
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 32, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = residual_basic(c, input, 64, 1, &infer_style())?;

    assert_eq!(graph.convolutions_count(), 3);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 64, 8, 8]);
    Ok(())
}

// ==================== bottleneck ====================

#[test]
fn test_residual_bottleneck_shapes() -> Result<(), GraphError> {
    // 输入 256 = 4f：恒等跳连
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 256, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = residual_bottleneck(c, input, 64, 1, &infer_style())?;

    assert_eq!(graph.convolutions_count(), 3);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 256, 8, 8]);

    // 通道扩张时投影（ResNet-50 首块形态：64 -> 256）
    let mut graph2 = Graph::new();
    let input2 = graph2.new_input_node(&[1, 64, 8, 8], Some("x"))?;
    let c2 = &mut Composer::new(&mut graph2);
    let out2 = residual_bottleneck(c2, input2, 64, 1, &infer_style())?;

    assert_eq!(graph2.convolutions_count(), 4);
    assert_eq!(graph2.get_node_value_expected_shape(out2)?, &[1, 256, 8, 8]);
    Ok(())
}

// ==================== darknet ====================

#[test]
fn test_darknet_residual_keeps_channels() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 64, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = darknet_residual(c, input, 64, &infer_style())?;

    // conv1x1 块(3) + conv3x3 块(3) + add
    assert_eq!(graph.nodes_count(), 1 + 7);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 64, 8, 8]);
    // 相加后不再激活
    assert_eq!(graph.get_node(out)?.type_name(), "add");
    Ok(())
}

#[test]
fn test_darknet_residual_rejects_channel_change() {
    // 通道数与输入不一致：没有投影路，相加处直接报形状错误
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 32, 8, 8], Some("x")).unwrap();
    let c = &mut Composer::new(&mut graph);
    let bad = darknet_residual(c, input, 64, &infer_style());
    assert_err!(bad, GraphError::ShapeMismatch { .. });
}

#[test]
fn test_darknet_residual_rejects_odd_filters() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 7, 8, 8], Some("x")).unwrap();
    let c = &mut Composer::new(&mut graph);
    let bad = darknet_residual(c, input, 7, &infer_style());
    assert_err!(
        bad,
        GraphError::InvalidConfiguration("darknet 残差块的滤波器数必须为偶数，实际7")
    );
}

// ==================== repvgg ====================

#[test]
fn test_repvgg_block_two_branches() -> Result<(), GraphError> {
    // 入口形态：3x3 与 1x1 两分支
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = repvgg_block(c, input, 16, 2, false, &infer_style())?;

    assert_eq!(graph.get_node(out)?.type_name(), "add");
    assert_eq!(graph.get_node_parents(out)?.len(), 2);
    assert_eq!(graph.get_node_value_expected_shape(out)?, &[1, 16, 4, 4]);
    Ok(())
}

#[test]
fn test_repvgg_block_identity_adds_third_branch() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 16, 8, 8], Some("x"))?;
    let c = &mut Composer::new(&mut graph);
    let out = repvgg_block(c, input, 16, 1, true, &infer_style())?;

    // 恒等分支只是一个归一化节点
    assert_eq!(graph.get_node_parents(out)?.len(), 3);
    assert_eq!(graph.convolutions_count(), 2);
    Ok(())
}

#[test]
fn test_repvgg_block_identity_preconditions() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 8, 8, 8], Some("x")).unwrap();
    let c = &mut Composer::new(&mut graph);

    // 步长 2 带恒等分支
    let strided = repvgg_block(c, input, 8, 2, true, &infer_style());
    assert_err!(
        strided,
        GraphError::InvalidConfiguration("repvgg 块的恒等分支要求步长为 1 且通道数不变，实际步长2、8->8")
    );

    // 通道数改变带恒等分支
    let widened = repvgg_block(c, input, 16, 1, true, &infer_style());
    assert_err!(
        widened,
        GraphError::InvalidConfiguration("repvgg 块的恒等分支要求步长为 1 且通道数不变，实际步长1、8->16")
    );
}
