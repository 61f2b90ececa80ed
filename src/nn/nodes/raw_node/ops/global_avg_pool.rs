/*
 * @Author       : 老董
 * @Date         : 2026-04-23
 * @Description  : 全局平均池化节点：把整个空间面收敛为 1x1，
 *                 即 [batch, C, H, W] -> [batch, C, 1, 1]。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalAvgPool;

impl GlobalAvgPool {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TraitNode for GlobalAvgPool {
    fn type_name(&self) -> &'static str {
        "global_avg_pool"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!(
                    "全局平均池化输入必须是 4D [batch, C, H, W]，得到 {input_shape:?}"
                ),
            });
        }
        Ok(vec![input_shape[0], input_shape[1], 1, 1])
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let input_shape = input.shape();
        let (batch_size, channels, h, w) = (
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        );
        let area = (h * w) as f32;

        // Rayon 并行计算每个 batch 样本
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; channels];
                for (c, out_val) in sample_data.iter_mut().enumerate() {
                    let mut sum = 0.0f32;
                    for hi in 0..h {
                        for wi in 0..w {
                            sum += input[[b, c, hi, wi]];
                        }
                    }
                    *out_val = sum / area;
                }
                sample_data
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Ok(Tensor::new(&all_data, &[batch_size, channels, 1, 1]))
    }
}
