/*
 * @Author       : 老董
 * @Date         : 2026-04-23
 * @Description  : 2D 卷积节点
 *
 * 设计决策：
 * - 单节点处理多通道，卷积核与偏置由节点自持（参数不占图节点）
 * - Batch-First 格式：输入必须是 4D [batch, C_in, H, W]
 * - 输出格式：[batch, C_out, H', W']
 * - 偏置带启用开关，供"归一化前卷积去偏置"改写 pass 翻转；
 *   禁用后偏置张量置空，序列化体积随之缩减
 * - 使用 Rayon 在 batch 维度并行加速
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 2D 卷积节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    /// 卷积核 [C_out, C_in, kH, kW]
    kernel: Tensor,
    /// 偏置 [C_out]，禁用后为空张量
    bias: Tensor,
    bias_enabled: bool,
    stride: (usize, usize),  // (sH, sW)
    padding: (usize, usize), // (pH, pW)
}

impl Conv2d {
    /// 创建 Conv2d 节点
    ///
    /// # 参数
    /// - `kernel`: 卷积核 [`C_out`, `C_in`, kH, kW]
    /// - `bias`: 偏置 [`C_out`]
    /// - `stride`: 步长 (sH, sW)
    /// - `padding`: 填充 (pH, pW)
    pub(crate) fn new(
        kernel: Tensor,
        bias: Tensor,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self, GraphError> {
        // 1. 验证卷积核形状：必须是 4D [C_out, C_in, kH, kW]
        if kernel.dimension() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: kernel.shape().to_vec(),
                message: format!(
                    "卷积核必须是 4D [C_out, C_in, kH, kW]，得到 {:?}",
                    kernel.shape()
                ),
            });
        }

        // 2. 验证偏置形状：必须是 1D [C_out]
        let out_channels = kernel.shape()[0];
        if bias.shape() != [out_channels] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![out_channels],
                got: bias.shape().to_vec(),
                message: "卷积偏置的长度必须等于输出通道数".to_string(),
            });
        }

        // 3. 验证步长为正
        if stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidConfiguration(format!(
                "卷积步长必须为正，实际{stride:?}"
            )));
        }

        Ok(Self {
            kernel,
            bias,
            bias_enabled: true,
            stride,
            padding,
        })
    }

    pub(crate) fn bias_enabled(&self) -> bool {
        self.bias_enabled
    }

    /// 禁用偏置并释放其存储
    pub(crate) fn disable_bias(&mut self) {
        self.bias_enabled = false;
        self.bias = Tensor::empty();
    }

    /// 对输入进行零填充（Rayon 并行版本）
    fn pad_input(&self, input: &Tensor) -> Tensor {
        let (pad_h, pad_w) = self.padding;
        if pad_h == 0 && pad_w == 0 {
            return input.clone();
        }

        let input_shape = input.shape();
        let (batch_size, c, h, w) = (input_shape[0], input_shape[1], input_shape[2], input_shape[3]);
        let new_h = h + 2 * pad_h;
        let new_w = w + 2 * pad_w;
        let new_shape = vec![batch_size, c, new_h, new_w];
        let single_sample_size = c * new_h * new_w;

        // Rayon 并行处理每个 batch 样本
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|bi| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for ci in 0..c {
                    for hi in 0..h {
                        for wi in 0..w {
                            let idx = ci * new_h * new_w + (hi + pad_h) * new_w + (wi + pad_w);
                            sample_data[idx] = input[[bi, ci, hi, wi]];
                        }
                    }
                }
                sample_data
            })
            .collect();

        // 合并结果
        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Tensor::new(&all_data, &new_shape)
    }

    /// 执行卷积运算（Rayon 并行版本），输入已填充
    fn convolve(&self, input: &Tensor) -> Tensor {
        let input_shape = input.shape();
        let (batch_size, in_c, in_h, in_w) = (
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        );

        let kernel = &self.kernel;
        let (out_c, k_h, k_w) = (kernel.shape()[0], kernel.shape()[2], kernel.shape()[3]);

        let (stride_h, stride_w) = self.stride;
        let out_h = (in_h - k_h) / stride_h + 1;
        let out_w = (in_w - k_w) / stride_w + 1;

        let output_shape = vec![batch_size, out_c, out_h, out_w];
        let single_sample_size = out_c * out_h * out_w;

        // Rayon 并行计算每个 batch 样本
        let batch_results: Vec<Vec<f32>> = (0..batch_size)
            .into_par_iter()
            .map(|b| {
                let mut sample_data = vec![0.0f32; single_sample_size];
                for oc in 0..out_c {
                    // 偏置直接作为累加初值
                    let init = if self.bias_enabled {
                        self.bias[[oc]]
                    } else {
                        0.0
                    };
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let mut sum = init;
                            let h_start = oh * stride_h;
                            let w_start = ow * stride_w;

                            for ic in 0..in_c {
                                for kh in 0..k_h {
                                    for kw in 0..k_w {
                                        let input_val =
                                            input[[b, ic, h_start + kh, w_start + kw]];
                                        sum += input_val * kernel[[oc, ic, kh, kw]];
                                    }
                                }
                            }
                            let idx = oc * out_h * out_w + oh * out_w + ow;
                            sample_data[idx] = sum;
                        }
                    }
                }
                sample_data
            })
            .collect();

        // 合并结果
        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Tensor::new(&all_data, &output_shape)
    }
}

impl TraitNode for Conv2d {
    fn type_name(&self) -> &'static str {
        "conv2d"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];

        // 1. 验证输入形状：必须是 4D [batch, C_in, H, W]（Batch-First）
        if input_shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!(
                    "Conv2d 输入必须是 4D [batch, C_in, H, W]，得到 {input_shape:?}。单样本请使用 [1, C_in, H, W]"
                ),
            });
        }
        let (batch_size, input_c, input_h, input_w) = (
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        );

        // 2. 验证通道数匹配
        let in_channels = self.kernel.shape()[1];
        if input_c != in_channels {
            return Err(GraphError::ShapeMismatch {
                expected: vec![in_channels],
                got: vec![input_c],
                message: format!("输入通道数 {input_c} 与卷积核输入通道数 {in_channels} 不匹配"),
            });
        }

        // 3. 计算输出尺寸
        let (out_channels, kernel_h, kernel_w) = (
            self.kernel.shape()[0],
            self.kernel.shape()[2],
            self.kernel.shape()[3],
        );
        let (stride_h, stride_w) = self.stride;
        let (pad_h, pad_w) = self.padding;

        let padded_h = input_h + 2 * pad_h;
        let padded_w = input_w + 2 * pad_w;
        if padded_h < kernel_h || padded_w < kernel_w {
            return Err(GraphError::InvalidOperation(format!(
                "卷积输出尺寸无效：输入 {input_h}x{input_w}，核 {kernel_h}x{kernel_w}，步长 {:?}，填充 {:?}",
                self.stride, self.padding
            )));
        }
        let output_h = (padded_h - kernel_h) / stride_h + 1;
        let output_w = (padded_w - kernel_w) / stride_w + 1;

        // 4. 输出形状：始终是 4D [batch, C_out, H', W']
        Ok(vec![batch_size, out_channels, output_h, output_w])
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let padded = self.pad_input(input);
        Ok(self.convolve(&padded))
    }

    fn params_count(&self) -> usize {
        self.kernel.size()
            + if self.bias_enabled {
                self.bias.size()
            } else {
                0
            }
    }
}
