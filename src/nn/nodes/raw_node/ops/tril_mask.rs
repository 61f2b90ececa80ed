/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 下三角掩码节点：把最后两维的严格上三角置为 -inf，
 *                 softmax 之后这些位置归零，实现因果注意力。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrilMask;

impl TrilMask {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TraitNode for TrilMask {
    fn type_name(&self) -> &'static str {
        "tril_mask"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "下三角掩码输入至少是 2D，得到 {input_shape:?}"
            )));
        }
        Ok(input_shape.to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let shape = input.shape();
        let rank = shape.len();
        let (rows, cols) = (shape[rank - 2], shape[rank - 1]);
        let mat_size = rows * cols;

        let mut out_data = input.data_as_slice().to_vec();
        for mat in out_data.chunks_mut(mat_size) {
            for i in 0..rows {
                for j in (i + 1)..cols {
                    mat[i * cols + j] = f32::NEG_INFINITY;
                }
            }
        }
        Ok(Tensor::new(&out_data, shape))
    }
}
