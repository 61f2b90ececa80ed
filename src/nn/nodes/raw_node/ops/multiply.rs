/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 逐元素乘法节点：右父节点按广播规则乘到左父节点上
 *                 （右侧各维须等于左侧或为 1）。eSE 门控的收口点，
 *                 如 [batch, C, H, W] × [batch, C, 1, 1]。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Multiply;

impl Multiply {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TraitNode for Multiply {
    fn type_name(&self) -> &'static str {
        "multiply"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 2, self.type_name())?;
        let (lhs, rhs) = (parent_shapes[0], parent_shapes[1]);

        // 右侧须可广播到左侧：同秩，各维等于左侧或为 1
        let broadcastable = lhs.len() == rhs.len()
            && lhs.iter().zip(rhs).all(|(&l, &r)| r == l || r == 1);
        if !broadcastable {
            return Err(GraphError::ShapeMismatch {
                expected: lhs.to_vec(),
                got: rhs.to_vec(),
                message: "逐元素乘法的右父节点无法广播到左父节点的形状".to_string(),
            });
        }
        Ok(lhs.to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let lhs = super::super::parent_value(parents, 0, self.type_name())?;
        let rhs = super::super::parent_value(parents, 1, self.type_name())?;
        // ndarray 的二元运算自带广播
        Ok(Tensor {
            data: &lhs.data * &rhs.data,
        })
    }
}
