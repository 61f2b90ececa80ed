/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 常数缩放节点：y = factor · x。注意力分数的 1/√dk
 *                 和推理形态下 dropout 折叠成的 (1-p) 都用它表达。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleConst {
    factor: f32,
}

impl ScaleConst {
    pub(crate) fn new(factor: f32) -> Self {
        Self { factor }
    }
}

impl TraitNode for ScaleConst {
    fn type_name(&self) -> &'static str {
        "scale_const"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        Ok(parent_shapes[0].to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        Ok(Tensor {
            data: &input.data * self.factor,
        })
    }
}
