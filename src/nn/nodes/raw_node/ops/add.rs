/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 逐元素求和节点：n 个同形状父节点相加（n ≥ 2），
 *                 残差结构的汇合点。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Add;

impl Add {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TraitNode for Add {
    fn type_name(&self) -> &'static str {
        "add"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        // 1. 验证父节点数量
        if parent_shapes.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "add节点至少需要2个父节点，实际{}个",
                parent_shapes.len()
            )));
        }

        // 2. 验证所有父节点形状一致
        let first = parent_shapes[0];
        for shape in &parent_shapes[1..] {
            if *shape != first {
                return Err(GraphError::ShapeMismatch {
                    expected: first.to_vec(),
                    got: shape.to_vec(),
                    message: "逐元素求和要求所有父节点形状一致".to_string(),
                });
            }
        }
        Ok(first.to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let first = super::super::parent_value(parents, 0, self.type_name())?;
        let mut acc = first.data.clone();
        for index in 1..parents.len() {
            let other = super::super::parent_value(parents, index, self.type_name())?;
            acc += &other.data;
        }
        Ok(Tensor { data: acc })
    }
}
