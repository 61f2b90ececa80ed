/*
 * @Author       : 老董
 * @Description  : FullyConnected 节点单元测试
 *
 * 测试策略：
 * 1. 基础功能测试（创建、各秩输入的形状推导、参数量）
 * 2. 前向传播测试（零输入、逐位置映射）
 */

use crate::assert_err;
use crate::nn::{Graph, GraphError};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

#[test]
fn test_fully_connected_creation() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[2, 4], Some("x")).unwrap();
    let fc = graph
        .new_fully_connected_node(input, 3, true, Some("head"))
        .unwrap();

    assert_eq!(graph.get_node_name(fc).unwrap(), "head");
    assert_eq!(graph.get_node_value_expected_shape(fc).unwrap(), &[2, 3]);
    // 3*4 + 3 = 15
    assert_eq!(graph.get_node(fc).unwrap().params_count(), 15);
    assert!(graph.get_node(fc).unwrap().has_enabled_bias());
}

#[test]
fn test_fully_connected_rank_handling() {
    let mut graph = Graph::new();

    // 1. 3D 输入逐位置映射：[b, s, d] -> [b, s, o]
    let tokens = graph.new_input_node(&[2, 5, 8], Some("tokens")).unwrap();
    let fc3 = graph.new_fully_connected_node(tokens, 4, true, None).unwrap();
    assert_eq!(graph.get_node_value_expected_shape(fc3).unwrap(), &[2, 5, 4]);
    assert_eq!(graph.get_node(fc3).unwrap().params_count(), 4 * 8 + 4);

    // 2. 4D 输入先展平：[b, c, h, w] -> [b, o]
    let image = graph.new_input_node(&[2, 3, 4, 4], Some("image")).unwrap();
    let fc4 = graph.new_fully_connected_node(image, 10, false, None).unwrap();
    assert_eq!(graph.get_node_value_expected_shape(fc4).unwrap(), &[2, 10]);
    assert_eq!(graph.get_node(fc4).unwrap().params_count(), 10 * 48);
}

#[test]
fn test_fully_connected_forward_zero_input() {
    // 偏置初始为零，零输入必然得到零输出
    let mut graph = Graph::new_with_seed(2);
    let input = graph.new_input_node(&[2, 6], Some("x")).unwrap();
    let fc = graph.new_fully_connected_node(input, 4, true, None).unwrap();

    graph.set_node_value(input, Tensor::zeros(&[2, 6])).unwrap();
    graph.forward(fc).unwrap();

    let output = graph.get_node_value(fc).unwrap().unwrap();
    assert_eq!(output.shape(), &[2, 4]);
    for &v in output.data_as_slice() {
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_fully_connected_forward_per_position() {
    // 3D 输入时每个序列位置用同一套权重：两个相同的位置必须得到相同输出
    let mut graph = Graph::new_with_seed(11);
    let input = graph.new_input_node(&[1, 2, 3], Some("tokens")).unwrap();
    let fc = graph.new_fully_connected_node(input, 5, true, None).unwrap();

    graph
        .set_node_value(
            input,
            Tensor::new(&[0.5, -1.0, 2.0, 0.5, -1.0, 2.0], &[1, 2, 3]),
        )
        .unwrap();
    graph.forward(fc).unwrap();

    let output = graph.get_node_value(fc).unwrap().unwrap();
    assert_eq!(output.shape(), &[1, 2, 5]);
    for o in 0..5 {
        assert_abs_diff_eq!(output[[0, 0, o]], output[[0, 1, o]], epsilon = 1e-6);
    }
}

#[test]
fn test_fully_connected_rejects_1d_parent() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[4], Some("x")).unwrap();
    let bad = graph.new_fully_connected_node(input, 3, true, None);
    assert_err!(
        bad,
        GraphError::InvalidOperation("全连接的父节点必须是 2D/3D/4D，得到 [4]")
    );
}
