/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 变形节点：batch 维不动，把每个样本重排成给定形状。
 *                 元素总数必须守恒。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reshape {
    /// 单样本的目标形状（不含 batch 维）
    sample_shape: Vec<usize>,
}

impl Reshape {
    pub(crate) fn new(sample_shape: &[usize]) -> Result<Self, GraphError> {
        if sample_shape.is_empty() || sample_shape.iter().any(|&d| d == 0) {
            return Err(GraphError::InvalidConfiguration(format!(
                "变形目标的各维必须为正，实际{sample_shape:?}"
            )));
        }
        Ok(Self {
            sample_shape: sample_shape.to_vec(),
        })
    }

    fn output_shape(&self, batch_size: usize) -> Vec<usize> {
        let mut shape = Vec::with_capacity(1 + self.sample_shape.len());
        shape.push(batch_size);
        shape.extend_from_slice(&self.sample_shape);
        shape
    }
}

impl TraitNode for Reshape {
    fn type_name(&self) -> &'static str {
        "reshape"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "变形输入至少是 2D [batch, ...]，得到 {input_shape:?}"
            )));
        }

        let sample_size: usize = input_shape[1..].iter().product();
        let target_size: usize = self.sample_shape.iter().product();
        if sample_size != target_size {
            return Err(GraphError::ShapeMismatch {
                expected: vec![sample_size],
                got: vec![target_size],
                message: format!(
                    "变形前后单样本元素数必须守恒：{:?} -> {:?}",
                    &input_shape[1..],
                    self.sample_shape
                ),
            });
        }
        Ok(self.output_shape(input_shape[0]))
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let batch_size = input.shape()[0];
        Ok(input.reshape(&self.output_shape(batch_size)))
    }
}
