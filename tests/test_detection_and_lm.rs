/*
 * @Author       : 老董
 * @Date         : 2026-05-21
 * @Description  : 库内目录（不进分类基准清单）的集成测试：
 *                 YOLOv5 检测网络与 vslm 自回归语言模型。
 */

use only_infer::arch::{vslm, yolov5n};
use only_infer::assert_err;
use only_infer::nn::blocks::Style;
use only_infer::nn::{Graph, GraphError};
use only_infer::tensor::Tensor;

// ==================== YOLOv5 ====================

#[test]
fn test_yolov5n_structure() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let net = yolov5n(&mut graph, 1, 64, &Style::infer())?;

    // 骨干 33 + 颈部与检测头 27
    assert_eq!(graph.convolutions_count(), 60);

    // 三个尺度的检测头汇入同一个终端
    let taps = graph.get_node_parents(net.output)?;
    assert_eq!(taps.len(), 3);
    for tap in taps {
        assert_eq!(graph.get_node(tap)?.type_name(), "sigmoid");
    }
    Ok(())
}

#[test]
fn test_yolov5n_forward_on_zero_image() -> Result<(), GraphError> {
    // 偏置零初始化下全零输入走到检测头的 logit 恒为零，sigmoid 后恒为 0.5
    let mut graph = Graph::new_with_seed(3);
    let net = yolov5n(&mut graph, 1, 64, &Style::infer())?;

    graph.set_node_value(net.input, Tensor::zeros(&[1, 3, 64, 64]))?;
    graph.forward(net.output)?;

    let output = graph.get_node_value(net.output)?.unwrap();
    // 终端透传最大尺度的检测头：64 边长下 p3 特征图是 8x8
    assert_eq!(output.shape(), &[1, 1, 8, 8]);
    assert!(output.data_as_slice().iter().all(|&v| v == 0.5));
    Ok(())
}

#[test]
fn test_yolov5n_rejects_size_not_divisible_by_32() {
    // 边长 50 过五次降采样后，颈部上采样与骨干支路对不齐
    let mut graph = Graph::new();
    let bad = yolov5n(&mut graph, 1, 50, &Style::infer());
    assert_err!(bad, GraphError::ShapeMismatch { .. });
}

// ==================== vslm ====================

#[test]
fn test_vslm_structure() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let net = vslm(&mut graph, 1, 80, &Style::infer())?;

    let input = graph.get_node(net.input)?;
    assert_eq!(input.name(), "tokens");
    assert_eq!(input.value_expected_shape(), &[1, 80]);

    // 终端透传词表 logits
    assert_eq!(
        graph.get_node_value_expected_shape(net.output)?,
        &[1, 80, 2000]
    );
    assert_eq!(graph.convolutions_count(), 0);

    // 嵌入 + 3 个 transformer 块 + 收束头
    assert_eq!(graph.params_count(), 868_096);
    Ok(())
}

#[test]
fn test_vslm_forward_smoke() -> Result<(), GraphError> {
    let mut graph = Graph::new_with_seed(11);
    let net = vslm(&mut graph, 1, 12, &Style::infer())?;

    let token_ids: Vec<f32> = (0..12).map(|i| i as f32).collect();
    graph.set_node_value(net.input, Tensor::new(&token_ids, &[1, 12]))?;
    graph.forward(net.output)?;

    let output = graph.get_node_value(net.output)?.unwrap();
    assert_eq!(output.shape(), &[1, 12, 2000]);
    assert!(output.data_as_slice().iter().all(|v| v.is_finite()));
    Ok(())
}

#[test]
fn test_vslm_rejects_sequence_beyond_positional_table() {
    // 默认位置编码表只铺到 80
    let mut graph = Graph::new();
    let bad = vslm(&mut graph, 1, 81, &Style::infer());
    assert_err!(bad, GraphError::InvalidConfiguration(_));
}
