/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 随机失活节点（训练形态）：以概率 rate 把元素置零，
 *                 不做补偿缩放。推理形态的网络用 ScaleConst(1-rate)
 *                 替代本节点。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    rate: f32,
}

impl Dropout {
    pub(crate) fn new(rate: f32) -> Result<Self, GraphError> {
        if !(0.0..1.0).contains(&rate) || rate == 0.0 {
            return Err(GraphError::InvalidConfiguration(format!(
                "随机失活率必须在 (0, 1) 内，实际{rate}"
            )));
        }
        Ok(Self { rate })
    }
}

impl TraitNode for Dropout {
    fn type_name(&self) -> &'static str {
        "dropout"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        Ok(parent_shapes[0].to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let mut rng = rand::thread_rng();
        let out_data: Vec<f32> = input
            .data_as_slice()
            .iter()
            .map(|&x| {
                if rng.r#gen::<f32>() < self.rate {
                    0.0
                } else {
                    x
                }
            })
            .collect();
        Ok(Tensor::new(&out_data, input.shape()))
    }
}
