/*
 * @Author       : 老董
 * @Date         : 2026-04-22
 * @Description  : 损失节点：网络的终端标记。推理基准不计算损失值，
 *                 前向时原样透传第一个父节点的输出。
 */

use super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 损失种类。只作为网络末端的结构标记，不参与数值计算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    /// 多分类对数损失（分类网络的统一出口）
    MulticlassLog,
    /// YOLO检测损失（挂接多个检测头）
    Yolo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loss {
    kind: LossKind,
}

impl Loss {
    pub(crate) fn new(kind: LossKind) -> Self {
        Self { kind }
    }

    pub(crate) fn kind(&self) -> LossKind {
        self.kind
    }
}

impl TraitNode for Loss {
    fn type_name(&self) -> &'static str {
        "loss"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        // 1. 验证父节点数量：至少1个（YOLO挂3个检测头）
        if parent_shapes.is_empty() {
            return Err(GraphError::InvalidOperation(
                "loss节点至少需要1个父节点".to_string(),
            ));
        }
        // 2. 输出形状透传第一个父节点
        Ok(parent_shapes[0].to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let first = super::parent_value(parents, 0, self.type_name())?;
        Ok(first.clone())
    }
}
