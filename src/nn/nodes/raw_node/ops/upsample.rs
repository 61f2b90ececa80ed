/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 最近邻上采样节点：空间面各维放大 factor 倍，
 *                 [batch, C, H, W] -> [batch, C, H·f, W·f]。
 *                 检测头（FPN/PAN）的上行通路用它。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upsample {
    factor: usize,
}

impl Upsample {
    pub(crate) fn new(factor: usize) -> Result<Self, GraphError> {
        if factor == 0 {
            return Err(GraphError::InvalidConfiguration(
                "上采样倍率必须为正".to_string(),
            ));
        }
        Ok(Self { factor })
    }
}

impl TraitNode for Upsample {
    fn type_name(&self) -> &'static str {
        "upsample"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!("上采样输入必须是 4D [batch, C, H, W]，得到 {input_shape:?}"),
            });
        }
        Ok(vec![
            input_shape[0],
            input_shape[1],
            input_shape[2] * self.factor,
            input_shape[3] * self.factor,
        ])
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
        let factor = self.factor;
        let (out_h, out_w) = (h * factor, w * factor);
        let single_sample_size = channels * out_h * out_w;

        // Rayon 并行计算每个 batch 样本
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for c in 0..channels {
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let idx = c * out_h * out_w + oh * out_w + ow;
                            sample_data[idx] = input[[b, c, oh / factor, ow / factor]];
                        }
                    }
                }
                sample_data
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Ok(Tensor::new(
            &all_data,
            &[batch_size, channels, out_h, out_w],
        ))
    }
}
