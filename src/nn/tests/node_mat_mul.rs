/*
 * @Author       : 老董
 * @Description  : MatMul 节点单元测试
 *
 * 测试策略：
 * 1. 批量矩阵乘法的数值验证
 * 2. transpose_rhs 形态（注意力的 q·kᵀ）
 * 3. 维度校验（收缩维、前导维）
 */

use crate::assert_err;
use crate::nn::{Graph, GraphError};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

#[test]
fn test_mat_mul_forward() {
    let mut graph = Graph::new();
    let lhs = graph.new_input_node(&[1, 2, 3], Some("lhs")).unwrap();
    let rhs = graph.new_input_node(&[1, 3, 2], Some("rhs")).unwrap();
    let prod = graph.new_mat_mul_node(lhs, rhs, false, None).unwrap();

    assert_eq!(graph.get_node_value_expected_shape(prod).unwrap(), &[1, 2, 2]);

    graph
        .set_node_value(lhs, Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 2, 3]))
        .unwrap();
    graph
        .set_node_value(
            rhs,
            Tensor::new(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0], &[1, 3, 2]),
        )
        .unwrap();
    graph.forward(prod).unwrap();

    // [[1,2,3],[4,5,6]] x [[7,8],[9,10],[11,12]] = [[58,64],[139,154]]
    let output = graph.get_node_value(prod).unwrap().unwrap();
    assert_abs_diff_eq!(output[[0, 0, 0]], 58.0, epsilon = 1e-5);
    assert_abs_diff_eq!(output[[0, 0, 1]], 64.0, epsilon = 1e-5);
    assert_abs_diff_eq!(output[[0, 1, 0]], 139.0, epsilon = 1e-5);
    assert_abs_diff_eq!(output[[0, 1, 1]], 154.0, epsilon = 1e-5);
}

#[test]
fn test_mat_mul_transpose_rhs() {
    // q·kᵀ 形态：rhs 以 [.., n, k] 存放，按转置参与乘法
    let mut graph = Graph::new();
    let lhs = graph.new_input_node(&[1, 2, 3], Some("q")).unwrap();
    let rhs = graph.new_input_node(&[1, 2, 3], Some("k")).unwrap();
    let prod = graph.new_mat_mul_node(lhs, rhs, true, None).unwrap();

    assert_eq!(graph.get_node_value_expected_shape(prod).unwrap(), &[1, 2, 2]);

    graph
        .set_node_value(lhs, Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 2, 3]))
        .unwrap();
    graph
        .set_node_value(rhs, Tensor::new(&[1.0, 0.0, 1.0, 0.0, 1.0, 1.0], &[1, 2, 3]))
        .unwrap();
    graph.forward(prod).unwrap();

    // [[1,2,3],[4,5,6]] x [[1,0],[0,1],[1,1]] = [[4,5],[10,11]]
    let output = graph.get_node_value(prod).unwrap().unwrap();
    assert_abs_diff_eq!(output[[0, 0, 0]], 4.0, epsilon = 1e-5);
    assert_abs_diff_eq!(output[[0, 0, 1]], 5.0, epsilon = 1e-5);
    assert_abs_diff_eq!(output[[0, 1, 0]], 10.0, epsilon = 1e-5);
    assert_abs_diff_eq!(output[[0, 1, 1]], 11.0, epsilon = 1e-5);
}

#[test]
fn test_mat_mul_4d_batch() {
    // 切头后的注意力形态 [b, h, s, d]
    let mut graph = Graph::new();
    let lhs = graph.new_input_node(&[2, 4, 5, 8], Some("q")).unwrap();
    let rhs = graph.new_input_node(&[2, 4, 5, 8], Some("k")).unwrap();
    let scores = graph.new_mat_mul_node(lhs, rhs, true, None).unwrap();
    assert_eq!(
        graph.get_node_value_expected_shape(scores).unwrap(),
        &[2, 4, 5, 5]
    );
}

#[test]
fn test_mat_mul_validation() {
    let mut graph = Graph::new();
    let lhs = graph.new_input_node(&[1, 2, 3], Some("lhs")).unwrap();

    // 1. 收缩维不匹配
    let bad_inner = graph.new_input_node(&[1, 4, 2], Some("bad_inner")).unwrap();
    let mismatched = graph.new_mat_mul_node(lhs, bad_inner, false, None);
    assert_err!(mismatched, GraphError::ShapeMismatch { .. });

    // 2. 前导维不匹配
    let bad_batch = graph.new_input_node(&[2, 3, 2], Some("bad_batch")).unwrap();
    let unaligned = graph.new_mat_mul_node(lhs, bad_batch, false, None);
    assert_err!(unaligned, GraphError::ShapeMismatch { .. });
}
