/*
 * @Author       : 老董
 * @Description  : AvgPool2d / GlobalAvgPool 节点单元测试
 *
 * 测试策略：
 * 1. 平均池化的形状推导与前向传播
 * 2. 边补计零且分母固定为窗口面积
 * 3. 全局平均池化坍缩到 [b, c, 1, 1]
 */

use crate::assert_err;
use crate::nn::{Graph, GraphError};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

#[test]
fn test_avg_pool2d_forward() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 1, 4, 4], Some("image")).unwrap();
    let pool = graph
        .new_avg_pool2d_node(input, (2, 2), (2, 2), (0, 0), None)
        .unwrap();

    let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
    graph
        .set_node_value(input, Tensor::new(&data, &[1, 1, 4, 4]))
        .unwrap();
    graph.forward(pool).unwrap();

    let output = graph.get_node_value(pool).unwrap().unwrap();
    assert_eq!(output.shape(), &[1, 1, 2, 2]);
    assert_abs_diff_eq!(output[[0, 0, 0, 0]], 2.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 0, 1]], 4.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 1, 0]], 10.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 0, 1, 1]], 12.5, epsilon = 1e-6);
}

#[test]
fn test_avg_pool2d_padding_counts_as_zero() {
    // 2x2 全一输入、p1：每个角窗口只罩住一个真实元素，分母仍是窗口面积 4
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 1, 2, 2], Some("image")).unwrap();
    let pool = graph
        .new_avg_pool2d_node(input, (2, 2), (2, 2), (1, 1), None)
        .unwrap();

    graph
        .set_node_value(input, Tensor::ones(&[1, 1, 2, 2]))
        .unwrap();
    graph.forward(pool).unwrap();

    let output = graph.get_node_value(pool).unwrap().unwrap();
    assert_eq!(output.shape(), &[1, 1, 2, 2]);
    for &v in output.data_as_slice() {
        assert_abs_diff_eq!(v, 0.25, epsilon = 1e-6);
    }
}

#[test]
fn test_avg_pool2d_config_validation() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 2, 4, 4], Some("image")).unwrap();
    let bad = graph.new_avg_pool2d_node(input, (2, 2), (0, 0), (0, 0), None);
    assert_err!(
        bad,
        GraphError::InvalidConfiguration("池化核与步长必须为正，实际核(2, 2)、步长(0, 0)")
    );
}

// ==================== 全局平均池化 ====================

#[test]
fn test_global_avg_pool_forward() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 2, 4, 4], Some("image")).unwrap();
    let pooled = graph.new_global_avg_pool_node(input, None).unwrap();

    assert_eq!(
        graph.get_node_value_expected_shape(pooled).unwrap(),
        &[1, 2, 1, 1]
    );

    // 通道 0 放 0..16，通道 1 放常数 3
    let mut data: Vec<f32> = (0..16).map(|i| i as f32).collect();
    data.extend(std::iter::repeat(3.0).take(16));
    graph
        .set_node_value(input, Tensor::new(&data, &[1, 2, 4, 4]))
        .unwrap();
    graph.forward(pooled).unwrap();

    let output = graph.get_node_value(pooled).unwrap().unwrap();
    assert_abs_diff_eq!(output[[0, 0, 0, 0]], 7.5, epsilon = 1e-6);
    assert_abs_diff_eq!(output[[0, 1, 0, 0]], 3.0, epsilon = 1e-6);
}

#[test]
fn test_global_avg_pool_rejects_non_4d() {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[2, 8], Some("x")).unwrap();
    let bad = graph.new_global_avg_pool_node(input, None);
    assert_err!(bad, GraphError::ShapeMismatch { .. });
}
