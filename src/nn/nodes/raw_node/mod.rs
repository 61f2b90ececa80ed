/*
 * @Author       : 老董
 * @Date         : 2026-04-22
 * @Description  : 原始节点：带种类标签的和类型（sum type）+ 行为 trait
 *
 * 设计决策：
 * - 节点种类用 enum + enum_dispatch 表达，不用 trait 对象层级；
 *   访问者/改写 pass 据此按种类匹配节点。
 * - 形状推导在构建期完成并验证（ShapeMismatch 在建图时就暴露，
 *   而不是等到第一次前向传播）。
 * - 携带参数的节点（卷积、全连接、归一化、嵌入）自持参数张量，
 *   偏置以可变开关（`bias_enabled`）暴露给改写 pass。
 */

mod input;
mod loss;
mod ops;

pub use input::Input;
pub use loss::{Loss, LossKind};
pub use ops::*;

use super::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

#[enum_dispatch]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum NodeType {
    Input(Input),
    Conv2d(Conv2d),
    FullyConnected(FullyConnected),
    MaxPool2d(MaxPool2d),
    AvgPool2d(AvgPool2d),
    GlobalAvgPool(GlobalAvgPool),
    BatchNorm(BatchNorm),
    Affine(Affine),
    RmsNorm(RmsNorm),
    Activation(Activation),
    Add(Add),
    Multiply(Multiply),
    Concat(Concat),
    MatMul(MatMul),
    Extract(Extract),
    Reshape(Reshape),
    Permute(Permute),
    ScaleConst(ScaleConst),
    Dropout(Dropout),
    Upsample(Upsample),
    TrilMask(TrilMask),
    Embedding(Embedding),
    PositionalEncoding(PositionalEncoding),
    Loss(Loss),
}

#[enum_dispatch(NodeType)]
pub(crate) trait TraitNode {
    /// 节点种类名（用于自动命名与 describe 表格）
    fn type_name(&self) -> &'static str;

    /// 构建期由父节点的预期形状推导本节点的输出形状。
    /// 父节点数量、形状兼容性都在这里验证，失败即拒绝建节点。
    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError>;

    /// 根据父节点的值计算本节点的值（调用前父节点的值已全部就绪）
    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError>;

    /// 本节点携带的可训练参数元素个数
    fn params_count(&self) -> usize {
        0
    }
}

// ========== 公共校验辅助 ==========

/// 验证父节点数量
pub(in crate::nn::nodes) fn ensure_parents_len(
    parent_shapes: &[&[usize]],
    expected: usize,
    node_type: &str,
) -> Result<(), GraphError> {
    if parent_shapes.len() != expected {
        return Err(GraphError::InvalidOperation(format!(
            "{node_type}节点需要{expected}个父节点，实际{}个",
            parent_shapes.len()
        )));
    }
    Ok(())
}

/// 取某个父节点的值（值缺失视为计算错误）
pub(in crate::nn::nodes) fn parent_value<'a>(
    parents: &[&'a NodeHandle],
    index: usize,
    node_type: &str,
) -> Result<&'a Tensor, GraphError> {
    parents
        .get(index)
        .and_then(|p| p.value())
        .ok_or_else(|| {
            GraphError::ComputationError(format!("{node_type}节点的第{index}个父节点没有值"))
        })
}
