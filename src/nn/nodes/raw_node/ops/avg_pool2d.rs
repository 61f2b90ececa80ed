/*
 * @Author       : 老董
 * @Date         : 2026-04-23
 * @Description  : 2D 平均池化节点。填充区按 0 计入、除数固定为窗口面积。
 */

use super::super::TraitNode;
use super::max_pool2d::pool_output_shape;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvgPool2d {
    kernel_size: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
}

impl AvgPool2d {
    pub(crate) fn new(
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self, GraphError> {
        if kernel_size.0 == 0 || kernel_size.1 == 0 || stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidConfiguration(format!(
                "池化核与步长必须为正，实际核{kernel_size:?}、步长{stride:?}"
            )));
        }
        Ok(Self {
            kernel_size,
            stride,
            padding,
        })
    }
}

impl TraitNode for AvgPool2d {
    fn type_name(&self) -> &'static str {
        "avg_pool2d"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        pool_output_shape(
            parent_shapes[0],
            self.kernel_size,
            self.stride,
            self.padding,
            self.type_name(),
        )
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let input_shape = input.shape();
        let (batch_size, channels, in_h, in_w) = (
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        );

        let (k_h, k_w) = self.kernel_size;
        let (stride_h, stride_w) = self.stride;
        let (pad_h, pad_w) = self.padding;
        let out_h = (in_h + 2 * pad_h - k_h) / stride_h + 1;
        let out_w = (in_w + 2 * pad_w - k_w) / stride_w + 1;
        let single_sample_size = channels * out_h * out_w;
        let window_area = (k_h * k_w) as f32;

        // Rayon 并行计算每个 batch 样本
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for c in 0..channels {
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let mut sum = 0.0f32;
                            for kh in 0..k_h {
                                for kw in 0..k_w {
                                    let ih = (oh * stride_h + kh) as isize - pad_h as isize;
                                    let iw = (ow * stride_w + kw) as isize - pad_w as isize;
                                    if ih >= 0
                                        && ih < in_h as isize
                                        && iw >= 0
                                        && iw < in_w as isize
                                    {
                                        sum += input[[b, c, ih as usize, iw as usize]];
                                    }
                                }
                            }
                            let idx = c * out_h * out_w + oh * out_w + ow;
                            sample_data[idx] = sum / window_area;
                        }
                    }
                }
                sample_data
            })
            .collect();

        // 合并结果
        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Ok(Tensor::new(
            &all_data,
            &[batch_size, channels, out_h, out_w],
        ))
    }
}
