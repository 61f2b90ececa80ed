/*
 * @Author       : 老董
 * @Date         : 2026-04-24
 * @Description  : 批归一化节点（训练形态）：按当前 batch 在 (batch, H, W)
 *                 维上统计各通道的均值与方差，再做 γ/β 仿射。
 *                 推理形态的网络应以 Affine 节点替代本节点。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EPS: f32 = 1e-5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    /// 缩放 γ [C]
    gamma: Tensor,
    /// 平移 β [C]
    beta: Tensor,
}

impl BatchNorm {
    pub(crate) fn new(gamma: Tensor, beta: Tensor) -> Result<Self, GraphError> {
        if gamma.dimension() != 1 || beta.shape() != gamma.shape() {
            return Err(GraphError::ShapeMismatch {
                expected: gamma.shape().to_vec(),
                got: beta.shape().to_vec(),
                message: "批归一化的 γ 与 β 必须是等长的 1D 张量".to_string(),
            });
        }
        Ok(Self { gamma, beta })
    }

    fn channels(&self) -> usize {
        self.gamma.shape()[0]
    }
}

impl TraitNode for BatchNorm {
    fn type_name(&self) -> &'static str {
        "batch_norm"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];

        // 1. 验证输入形状：必须是 4D [batch, C, H, W]
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!("批归一化输入必须是 4D [batch, C, H, W]，得到 {input_shape:?}"),
            });
        }

        // 2. 验证通道数匹配
        if input_shape[1] != self.channels() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.channels()],
                got: vec![input_shape[1]],
                message: "批归一化的通道数与输入不匹配".to_string(),
            });
        }
        Ok(input_shape.to_vec())
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
        let count = (batch_size * h * w) as f32;

        // 第一遍：按通道统计均值与方差（Rayon 并行于通道维）
        let channel_stats: Vec<(f32, f32)> = (0..channels)
            .into_par_iter()
            .map(|c| {
                let mut sum = 0.0f32;
                let mut sum_sq = 0.0f32;
                for b in 0..batch_size {
                    for hi in 0..h {
                        for wi in 0..w {
                            let val = input[[b, c, hi, wi]];
                            sum += val;
                            sum_sq += val * val;
                        }
                    }
                }
                let mean = sum / count;
                let variance = sum_sq / count - mean * mean;
                (mean, (variance + EPS).sqrt().recip())
            })
            .collect();

        // 第二遍：归一化并套 γ/β（Rayon 并行于 batch 维）
        let single_sample_size = channels * h * w;
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for c in 0..channels {
                    let (mean, inv_std) = channel_stats[c];
                    let gamma = self.gamma[[c]];
                    let beta = self.beta[[c]];
                    for hi in 0..h {
                        for wi in 0..w {
                            let idx = c * h * w + hi * w + wi;
                            sample_data[idx] = (input[[b, c, hi, wi]] - mean) * inv_std * gamma + beta;
                        }
                    }
                }
                sample_data
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Ok(Tensor::new(&all_data, input_shape))
    }

    fn params_count(&self) -> usize {
        self.gamma.size() + self.beta.size()
    }
}
