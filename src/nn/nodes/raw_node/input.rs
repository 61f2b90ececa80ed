/*
 * @Author       : 老董
 * @Date         : 2026-04-22
 * @Description  : 输入节点：形状在建图时声明，值由外部在前向传播前注入。
 */

use super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Input {
    shape: Vec<usize>,
}

impl Input {
    pub(crate) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        // 1. 验证形状非空且各维为正
        if shape.is_empty() || shape.iter().any(|&d| d == 0) {
            return Err(GraphError::InvalidConfiguration(format!(
                "输入节点的形状各维必须为正，实际{shape:?}"
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for Input {
    fn type_name(&self) -> &'static str {
        "input"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::ensure_parents_len(parent_shapes, 0, self.type_name())?;
        Ok(self.shape.clone())
    }

    fn calc_value_by_parents(&self, _parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        Err(GraphError::InvalidOperation(
            "输入节点的值只能由外部赋值，不能由图计算".to_string(),
        ))
    }
}
