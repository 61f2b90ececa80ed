/*
 * @Author       : 老董
 * @Date         : 2026-04-24
 * @Description  : 仿射节点（批归一化的推理形态）：y = scale[c]·x + shift[c]，
 *                 逐通道定值变换，不统计 batch。系数视为由训练期批归一化
 *                 折叠而来，推理时冻结，故不计入可训练参数。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affine {
    /// 缩放 [C]
    scale: Tensor,
    /// 平移 [C]
    shift: Tensor,
}

impl Affine {
    pub(crate) fn new(scale: Tensor, shift: Tensor) -> Result<Self, GraphError> {
        if scale.dimension() != 1 || shift.shape() != scale.shape() {
            return Err(GraphError::ShapeMismatch {
                expected: scale.shape().to_vec(),
                got: shift.shape().to_vec(),
                message: "仿射的 scale 与 shift 必须是等长的 1D 张量".to_string(),
            });
        }
        Ok(Self { scale, shift })
    }

    fn channels(&self) -> usize {
        self.scale.shape()[0]
    }
}

impl TraitNode for Affine {
    fn type_name(&self) -> &'static str {
        "affine"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!("仿射输入必须是 4D [batch, C, H, W]，得到 {input_shape:?}"),
            });
        }
        if input_shape[1] != self.channels() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.channels()],
                got: vec![input_shape[1]],
                message: "仿射的通道数与输入不匹配".to_string(),
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
        let single_sample_size = channels * h * w;

        // Rayon 并行计算每个 batch 样本
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for c in 0..channels {
                    let scale = self.scale[[c]];
                    let shift = self.shift[[c]];
                    for hi in 0..h {
                        for wi in 0..w {
                            let idx = c * h * w + hi * w + wi;
                            sample_data[idx] = scale * input[[b, c, hi, wi]] + shift;
                        }
                    }
                }
                sample_data
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Ok(Tensor::new(&all_data, input_shape))
    }

    // 冻结系数不计入可训练参数，params_count 用默认值 0
}
