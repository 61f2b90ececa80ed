/*
 * @Author       : 老董
 * @Date         : 2026-04-23
 * @Description  : 全连接节点：y = x·Wᵀ + b，权重与偏置由节点自持。
 *
 * 输入形状约定：
 * - 2D [batch, I]          -> [batch, O]
 * - 3D [batch, seq, I]     -> [batch, seq, O]（逐位置线性变换）
 * - 4D [batch, C, H, W]    -> [batch, O]（C*H*W 摊平后须等于 I）
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullyConnected {
    /// 权重 [O, I]
    weight: Tensor,
    /// 偏置 [O]，禁用后为空张量
    bias: Tensor,
    bias_enabled: bool,
}

impl FullyConnected {
    pub(crate) fn new(weight: Tensor, bias: Tensor) -> Result<Self, GraphError> {
        // 1. 验证权重形状：必须是 2D [O, I]
        if weight.dimension() != 2 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0], // 占位
                got: weight.shape().to_vec(),
                message: format!("全连接权重必须是 2D [O, I]，得到 {:?}", weight.shape()),
            });
        }

        // 2. 验证偏置形状：必须是 1D [O]
        let out_features = weight.shape()[0];
        if bias.shape() != [out_features] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![out_features],
                got: bias.shape().to_vec(),
                message: "全连接偏置的长度必须等于输出维度".to_string(),
            });
        }

        Ok(Self {
            weight,
            bias,
            bias_enabled: true,
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

    fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    /// 把输入视为 rows 行、每行 I 个元素，逐行做线性变换（Rayon 并行）
    fn linear_rows(&self, data: &[f32], rows: usize) -> Vec<f32> {
        let in_features = self.in_features();
        let out_features = self.out_features();

        let row_results: Vec<Vec<f32>> = (0..rows)
            .into_par_iter()
            .map(|r| {
                let row = &data[r * in_features..(r + 1) * in_features];
                let mut out_row = vec![0.0f32; out_features];
                for (o, out_val) in out_row.iter_mut().enumerate() {
                    let mut sum = if self.bias_enabled { self.bias[[o]] } else { 0.0 };
                    for (i, &x) in row.iter().enumerate() {
                        sum += x * self.weight[[o, i]];
                    }
                    *out_val = sum;
                }
                out_row
            })
            .collect();

        row_results.into_iter().flatten().collect()
    }
}

impl TraitNode for FullyConnected {
    fn type_name(&self) -> &'static str {
        "fully_connected"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        let in_features = self.in_features();
        let out_features = self.out_features();

        match input_shape.len() {
            2 => {
                if input_shape[1] != in_features {
                    return Err(GraphError::ShapeMismatch {
                        expected: vec![input_shape[0], in_features],
                        got: input_shape.to_vec(),
                        message: "全连接输入的特征维与权重不匹配".to_string(),
                    });
                }
                Ok(vec![input_shape[0], out_features])
            }
            3 => {
                if input_shape[2] != in_features {
                    return Err(GraphError::ShapeMismatch {
                        expected: vec![input_shape[0], input_shape[1], in_features],
                        got: input_shape.to_vec(),
                        message: "全连接输入的特征维与权重不匹配".to_string(),
                    });
                }
                Ok(vec![input_shape[0], input_shape[1], out_features])
            }
            4 => {
                // 4D 输入摊平为 [batch, C*H*W]
                let flattened = input_shape[1] * input_shape[2] * input_shape[3];
                if flattened != in_features {
                    return Err(GraphError::ShapeMismatch {
                        expected: vec![in_features],
                        got: vec![flattened],
                        message: "4D 输入摊平后的特征维与权重不匹配".to_string(),
                    });
                }
                Ok(vec![input_shape[0], out_features])
            }
            _ => Err(GraphError::InvalidOperation(format!(
                "全连接输入必须是 2D/3D/4D，得到 {input_shape:?}"
            ))),
        }
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let input_shape = input.shape();
        let in_features = self.in_features();
        let out_features = self.out_features();

        let rows = input.size() / in_features;
        let out_data = self.linear_rows(input.data_as_slice(), rows);

        let output_shape = match input_shape.len() {
            3 => vec![input_shape[0], input_shape[1], out_features],
            _ => vec![input_shape[0], out_features],
        };
        Ok(Tensor::new(&out_data, &output_shape))
    }

    fn params_count(&self) -> usize {
        self.weight.size()
            + if self.bias_enabled {
                self.bias.size()
            } else {
                0
            }
    }
}
