/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : 经典网络结构目录。每个家族一个文件，构建函数统一签名
 *                 (图, 批量, 输入边长或序列长, 风格) -> BuiltNet；
 *                 家族固有的激活/归一化选择在各自构建函数里钉死，
 *                 训练/推理形态由调用方传入的 Style 决定。
 */

mod alexnet;
mod darknet;
mod densenet;
mod googlenet;
mod repvgg;
mod resnet;
mod squeezenet;
mod transformer;
mod vggnet;
mod vovnet;
mod yolov5;

pub use alexnet::alexnet;
pub use darknet::{darknet19, darknet53, darknet53_csp};
pub use densenet::{densenet121, densenet169, densenet201, densenet264};
pub use googlenet::googlenet;
pub use repvgg::{repvgg_a0, repvgg_a1, repvgg_a2, repvgg_b0, repvgg_b1, repvgg_b2, repvgg_b3};
pub use resnet::{resnet101, resnet152, resnet18, resnet34, resnet50};
pub use squeezenet::{squeezenet1_0, squeezenet1_1};
pub use transformer::{transformer_lm, vslm, TransformerConfig};
pub use vggnet::{vggnet11, vggnet13, vggnet16, vggnet19};
pub use vovnet::{vovnet19, vovnet19_slim, vovnet39, vovnet57, vovnet99};
pub use yolov5::{yolov5l, yolov5m, yolov5n, yolov5s, yolov5x};

use crate::nn::blocks::{ensure_positive, Composer};
use crate::nn::{Graph, GraphError, LossKind, NodeId};

/// 分类网络的类别数
pub(crate) const NUM_CLASSES: usize = 1000;

/// 组装完成的网络：输入节点与终端（损失）节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltNet {
    pub input: NodeId,
    pub output: NodeId,
}

/// 目录的统一构建函数签名
pub type ArchBuilder =
    fn(&mut Graph, usize, usize, &crate::nn::blocks::Style) -> Result<BuiltNet, GraphError>;

/// 基准覆盖的分类网络清单（名字已按报表列宽补齐空格）
pub fn classification_set() -> Vec<(&'static str, ArchBuilder)> {
    vec![
        ("alexnet  ", alexnet as ArchBuilder),
        ("sqznet1.0", squeezenet1_0),
        ("sqznet1.1", squeezenet1_1),
        ("vggnet11 ", vggnet11),
        ("vggnet13 ", vggnet13),
        ("vggnet16 ", vggnet16),
        ("vggnet19 ", vggnet19),
        ("googlenet", googlenet),
        ("resnet18 ", resnet18),
        ("resnet34 ", resnet34),
        ("resnet50 ", resnet50),
        ("resnet101", resnet101),
        ("resnet152", resnet152),
        ("darknet19", darknet19),
        ("darknet53", darknet53),
        ("darknet53csp", darknet53_csp),
        ("densenet121", densenet121),
        ("densenet169", densenet169),
        ("densenet201", densenet201),
        ("densenet264", densenet264),
        ("vovnet19s", vovnet19_slim),
        ("vovnet19 ", vovnet19),
        ("vovnet39 ", vovnet39),
        ("vovnet57 ", vovnet57),
        ("vovnet99 ", vovnet99),
    ]
}

/// 图像网络的输入节点：[batch, 3, size, size]
pub(crate) fn image_input(
    graph: &mut Graph,
    batch_size: usize,
    image_size: usize,
) -> Result<NodeId, GraphError> {
    ensure_positive(batch_size, "批量大小")?;
    ensure_positive(image_size, "输入边长")?;
    graph.new_input_node(&[batch_size, 3, image_size, image_size], Some("image"))
}

/// 通用分类头：gap -> fc(1000) -> 多分类对数损失
pub(crate) fn classification_head(
    c: &mut Composer,
    backbone_out: NodeId,
) -> Result<NodeId, GraphError> {
    let pooled = c.graph().new_global_avg_pool_node(backbone_out, None)?;
    let logits = c
        .graph()
        .new_fully_connected_node(pooled, NUM_CLASSES, true, None)?;
    c.graph()
        .new_loss_node(&[logits], LossKind::MulticlassLog, None)
}
