/*
 * @Author       : 老董
 * @Date         : 2026-04-24
 * @Description  : RMS 归一化节点：对最后一维做 x / rms(x) · γ，
 *                 其中 rms(x) = sqrt(mean(x²) + ε)。Transformer 块专用。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EPS: f32 = 1e-5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmsNorm {
    /// 缩放 γ [D]，D 为被归一化的最后一维
    gamma: Tensor,
}

impl RmsNorm {
    pub(crate) fn new(gamma: Tensor) -> Result<Self, GraphError> {
        if gamma.dimension() != 1 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0], // 占位
                got: gamma.shape().to_vec(),
                message: "RMS 归一化的 γ 必须是 1D 张量".to_string(),
            });
        }
        Ok(Self { gamma })
    }

    fn dim(&self) -> usize {
        self.gamma.shape()[0]
    }
}

impl TraitNode for RmsNorm {
    fn type_name(&self) -> &'static str {
        "rms_norm"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "RMS 归一化输入至少是 2D，得到 {input_shape:?}"
            )));
        }
        let last = *input_shape.last().unwrap();
        if last != self.dim() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.dim()],
                got: vec![last],
                message: "RMS 归一化的 γ 长度与输入最后一维不匹配".to_string(),
            });
        }
        Ok(input_shape.to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let dim = self.dim();
        let rows = input.size() / dim;
        let data = input.data_as_slice();

        // 按行（最后一维连续）并行归一化
        let row_results: Vec<Vec<f32>> = (0..rows)
            .into_par_iter()
            .map(|r| {
                let row = &data[r * dim..(r + 1) * dim];
                let mean_sq = row.iter().map(|&x| x * x).sum::<f32>() / dim as f32;
                let inv_rms = (mean_sq + EPS).sqrt().recip();
                row.iter()
                    .enumerate()
                    .map(|(i, &x)| x * inv_rms * self.gamma[[i]])
                    .collect()
            })
            .collect();

        let all_data: Vec<f32> = row_results.into_iter().flatten().collect();
        Ok(Tensor::new(&all_data, input.shape()))
    }

    fn params_count(&self) -> usize {
        self.gamma.size()
    }
}
