/*
 * @Author       : 老董
 * @Date         : 2026-05-21
 * @Description  : 分类网络目录集成测试。整个目录在小输入上构建成功，
 *                 并抽查各家族的卷积数、层数与偏置去重行为。
 */

use only_infer::arch::{
    alexnet, classification_set, darknet19, darknet53, densenet121, googlenet, repvgg_a0,
    resnet18, resnet50, squeezenet1_0, vggnet11, vggnet19, vovnet19_slim, ArchBuilder, BuiltNet,
};
use only_infer::assert_err;
use only_infer::nn::blocks::{NormForm, Style};
use only_infer::nn::{Graph, GraphError};

/// 目录统一用的小输入：批量 1、边长 64（够经受五次降采样）
const IMAGE: usize = 64;

fn build_one(builder: ArchBuilder) -> (Graph, BuiltNet) {
    let mut graph = Graph::new();
    let net = builder(&mut graph, 1, IMAGE, &Style::infer()).unwrap();
    (graph, net)
}

// ==================== 目录完整性 ====================

#[test]
fn test_whole_catalog_builds() {
    for (name, builder) in classification_set() {
        let mut graph = Graph::new();
        let net = builder(&mut graph, 1, IMAGE, &Style::infer())
            .unwrap_or_else(|e| panic!("{} 构建失败: {e}", name.trim()));

        // 输入统一叫 image，终端统一是损失节点
        assert_eq!(graph.get_node(net.input).unwrap().name(), "image");
        assert!(graph.get_node(net.output).unwrap().is_loss());
        assert_eq!(
            graph.get_node_value_expected_shape(net.input).unwrap(),
            &[1, 3, IMAGE, IMAGE]
        );

        // 单输入单损失的网络：层数 = 节点数 - 2
        assert_eq!(
            graph.layers_count(),
            graph.nodes_count() - 2,
            "{} 的层数与节点数不自洽",
            name.trim()
        );
    }
}

// ==================== 卷积数抽查 ====================

#[test]
fn test_convolution_counts_per_family() {
    let expected: [(&str, ArchBuilder, usize); 11] = [
        ("alexnet", alexnet, 5),
        ("squeezenet1_0", squeezenet1_0, 26),
        ("vggnet11", vggnet11, 8),
        ("vggnet19", vggnet19, 16),
        ("googlenet", googlenet, 57),
        ("resnet18", resnet18, 20),
        ("resnet50", resnet50, 53),
        ("darknet19", darknet19, 18),
        ("darknet53", darknet53, 52),
        ("densenet121", densenet121, 120),
        ("vovnet19_slim", vovnet19_slim, 23),
    ];

    for (name, builder, convolutions) in expected {
        let (graph, _) = build_one(builder);
        assert_eq!(
            graph.convolutions_count(),
            convolutions,
            "{name} 的卷积数不对"
        );
    }
}

// ==================== 偏置去重 ====================

#[test]
fn test_bias_rewrite_per_family() {
    // 无归一化家族：没有可去的偏置
    for builder in [alexnet as ArchBuilder, squeezenet1_0] {
        let (mut graph, _) = build_one(builder);
        assert_eq!(graph.disable_duplicative_bias().unwrap(), 0);
    }

    // 卷积全部跟归一化的家族：逐一去光
    let (mut graph, _) = build_one(resnet18);
    assert_eq!(graph.disable_duplicative_bias().unwrap(), 20);
    let (mut graph, _) = build_one(vggnet11);
    assert_eq!(graph.disable_duplicative_bias().unwrap(), 8);

    // 预激活密集网：只有 conv1x1 被去（conv3x3 直喂拼接、过渡卷积直喂池化）
    let (mut graph, _) = build_one(densenet121);
    assert_eq!(graph.disable_duplicative_bias().unwrap(), 1 + 58);

    // eSE 门控卷积幸免，其余都去
    let (mut graph, _) = build_one(vovnet19_slim);
    assert_eq!(graph.disable_duplicative_bias().unwrap(), 19);
}

#[test]
fn test_bias_rewrite_is_idempotent_and_shrinks_params() {
    let (mut graph, _) = build_one(resnet18);
    let params_before = graph.params_count();

    assert_eq!(graph.disable_duplicative_bias().unwrap(), 20);
    // 各段卷积偏置元素数：5*64 + 5*128 + 5*256 + 5*512
    assert_eq!(params_before - graph.params_count(), 4800);

    // 第二遍无事可做
    assert_eq!(graph.disable_duplicative_bias().unwrap(), 0);
}

// ==================== RepVGG 双形态 ====================

#[test]
fn test_repvgg_multibranch_vs_plain() {
    // 多分支形态：5 个入口块 + 17 个段内块各 2 条卷积支，
    // 段内块还多一条恒等归一化支（三路相加）
    let (graph, _) = build_one(repvgg_a0);
    assert_eq!(graph.convolutions_count(), 44);
    assert_eq!(
        graph.count_nodes(|n| n.type_name() == "add" && n.parents().len() == 3),
        17
    );

    // 重参数化后的部署形态：单路 conv3x3，没有任何相加
    let mut graph = Graph::new();
    let style = Style::infer().with_norm(NormForm::None);
    repvgg_a0(&mut graph, 1, IMAGE, &style).unwrap();
    assert_eq!(graph.convolutions_count(), 22);
    assert_eq!(graph.count_nodes(|n| n.type_name() == "add"), 0);
}

// ==================== 构建参数校验 ====================

#[test]
fn test_rejects_zero_batch_and_size() {
    let mut graph = Graph::new();
    let zero_batch = resnet18(&mut graph, 0, IMAGE, &Style::infer());
    assert_err!(zero_batch, GraphError::InvalidConfiguration("批量大小必须为正"));

    let mut graph = Graph::new();
    let zero_size = resnet18(&mut graph, 1, 0, &Style::infer());
    assert_err!(zero_size, GraphError::InvalidConfiguration("输入边长必须为正"));
}
