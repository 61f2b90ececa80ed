/*
 * @Author       : 老董
 * @Description  : 图遍历与改写 pass 的单元测试
 *
 * 测试策略：
 * 1. visit_nodes / count_nodes 的遍历顺序与计数
 * 2. convolutions_count / layers_count 统计口径
 * 3. 偏置去重 pass 的各种拓扑（吸收、保留、扇出、幂等）
 */

use crate::nn::{ActivationKind, Graph, GraphError, LossKind, NodeId};

/// input -> conv -> bn -> relu -> conv -> relu -> gap -> fc -> loss
fn small_backbone(graph: &mut Graph) -> Result<NodeId, GraphError> {
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("image"))?;
    let conv1 = graph.new_conv2d_node(input, 4, (3, 3), (1, 1), (1, 1), true, None)?;
    let bn = graph.new_batch_norm_node(conv1, None)?;
    let act1 = graph.new_activation_node(bn, ActivationKind::Relu, None)?;
    let conv2 = graph.new_conv2d_node(act1, 8, (3, 3), (1, 1), (1, 1), true, None)?;
    let act2 = graph.new_activation_node(conv2, ActivationKind::Relu, None)?;
    let pooled = graph.new_global_avg_pool_node(act2, None)?;
    let fc = graph.new_fully_connected_node(pooled, 10, true, None)?;
    graph.new_loss_node(&[fc], LossKind::MulticlassLog, None)
}

#[test]
fn test_node_counters() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    small_backbone(&mut graph)?;

    assert_eq!(graph.nodes_count(), 9);
    assert_eq!(graph.convolutions_count(), 2);
    // 输入与损失不算层
    assert_eq!(graph.layers_count(), 7);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "relu"), 2);
    assert_eq!(graph.count_nodes(|n| n.is_normalization()), 1);
    Ok(())
}

#[test]
fn test_visit_nodes_creation_order() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 4], Some("x"))?;
    let fc1 = graph.new_fully_connected_node(input, 4, true, Some("fc_a"))?;
    let _fc2 = graph.new_fully_connected_node(fc1, 4, true, Some("fc_b"))?;
    let _back = graph.new_fully_connected_node(input, 4, true, Some("fc_c"))?;

    // 遍历顺序是创建顺序，与拓扑无关
    let mut names = Vec::new();
    let visited = graph.visit_nodes(
        |n| n.type_name() == "fully_connected",
        |n| {
            names.push(n.name().to_string());
            Ok(())
        },
    )?;
    assert_eq!(visited, 3);
    assert_eq!(names, vec!["fc_a", "fc_b", "fc_c"]);
    Ok(())
}

// ==================== 偏置去重 pass ====================

#[test]
fn test_bias_absorbed_by_batch_norm() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("image"))?;
    let conv = graph.new_conv2d_node(input, 4, (3, 3), (1, 1), (1, 1), true, None)?;
    let _bn = graph.new_batch_norm_node(conv, None)?;

    let before = graph.params_count();
    let disabled = graph.disable_duplicative_bias()?;
    assert_eq!(disabled, 1);
    // 偏置 4 个参数被去掉
    assert_eq!(graph.params_count(), before - 4);
    assert!(!graph.get_node(conv)?.has_enabled_bias());
    Ok(())
}

#[test]
fn test_bias_absorbed_by_affine() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("image"))?;
    let conv = graph.new_conv2d_node(input, 4, (3, 3), (1, 1), (1, 1), true, None)?;
    let _affine = graph.new_affine_node(conv, None)?;

    assert_eq!(graph.disable_duplicative_bias()?, 1);
    assert!(!graph.get_node(conv)?.has_enabled_bias());
    Ok(())
}

#[test]
fn test_bias_kept_without_norm() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("image"))?;
    let conv = graph.new_conv2d_node(input, 4, (3, 3), (1, 1), (1, 1), true, None)?;
    let _relu = graph.new_activation_node(conv, ActivationKind::Relu, None)?;

    assert_eq!(graph.disable_duplicative_bias()?, 0);
    assert!(graph.get_node(conv)?.has_enabled_bias());
    Ok(())
}

#[test]
fn test_bias_kept_on_terminal_conv() -> Result<(), GraphError> {
    // 没有子节点的卷积不改写
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("image"))?;
    let conv = graph.new_conv2d_node(input, 4, (3, 3), (1, 1), (1, 1), true, None)?;

    assert_eq!(graph.disable_duplicative_bias()?, 0);
    assert!(graph.get_node(conv)?.has_enabled_bias());
    Ok(())
}

#[test]
fn test_bias_kept_on_fan_out() -> Result<(), GraphError> {
    // 卷积同时喂给归一化和拼接：偏置经拼接路仍然可见，必须保留
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1, 3, 8, 8], Some("image"))?;
    let conv = graph.new_conv2d_node(input, 4, (3, 3), (1, 1), (1, 1), true, None)?;
    let bn = graph.new_batch_norm_node(conv, None)?;
    let _merged = graph.new_concat_node(&[conv, bn], None)?;

    assert_eq!(graph.disable_duplicative_bias()?, 0);
    assert!(graph.get_node(conv)?.has_enabled_bias());
    Ok(())
}

#[test]
fn test_bias_pass_is_idempotent() -> Result<(), GraphError> {
    let mut graph = Graph::new();
    small_backbone(&mut graph)?;

    // 骨干里只有 conv1 后面直接跟归一化
    let nodes_before = graph.nodes_count();
    assert_eq!(graph.disable_duplicative_bias()?, 1);
    let after_first = graph.params_count();
    assert_eq!(graph.disable_duplicative_bias()?, 0);
    assert_eq!(graph.params_count(), after_first);
    // 改写只拨偏置开关，不增删节点
    assert_eq!(graph.nodes_count(), nodes_before);
    Ok(())
}

#[test]
fn test_visit_nodes_can_disable_all_bias() -> Result<(), GraphError> {
    // 用通用遍历写一个"全部去偏置"的 pass
    let mut graph = Graph::new();
    small_backbone(&mut graph)?;

    let before = graph.params_count();
    let visited = graph.visit_nodes(
        |n| n.has_enabled_bias() && n.is_convolution(),
        |n| n.disable_bias(),
    )?;
    assert_eq!(visited, 2);
    // conv1 偏置 4 个、conv2 偏置 8 个
    assert_eq!(graph.params_count(), before - 12);
    Ok(())
}
