/*
 * @Author       : 老董
 * @Date         : 2026-04-24
 * @Description  : 激活节点：单一节点种类承载各种激活函数，
 *                 形状恒等透传。softmax 作用于最后一维并做减最大值稳定。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 激活函数种类
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationKind {
    Relu,
    /// 负半轴斜率
    LeakyRelu(f32),
    Sigmoid,
    /// x · sigmoid(x)
    Silu,
    /// tanh 近似形式
    Gelu,
    /// 最后一维 softmax
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    kind: ActivationKind,
}

impl Activation {
    pub(crate) fn new(kind: ActivationKind) -> Self {
        Self { kind }
    }

    pub(crate) fn kind(&self) -> ActivationKind {
        self.kind
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn gelu(x: f32) -> f32 {
    const SQRT_2_OVER_PI: f32 = 0.797_884_6;
    0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + 0.044_715 * x * x * x)).tanh())
}

/// 对一段连续的行做减最大值的稳定 softmax
fn softmax_rows(data: &[f32], dim: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(dim) {
        let max_val = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = row.iter().map(|&x| (x - max_val).exp()).collect();
        let sum: f32 = exps.iter().sum();
        out.extend(exps.iter().map(|&e| e / sum));
    }
    out
}

impl TraitNode for Activation {
    fn type_name(&self) -> &'static str {
        match self.kind {
            ActivationKind::Relu => "relu",
            ActivationKind::LeakyRelu(_) => "leaky_relu",
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::Silu => "silu",
            ActivationKind::Gelu => "gelu",
            ActivationKind::Softmax => "softmax",
        }
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        Ok(parent_shapes[0].to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let data = input.data_as_slice();

        let out_data: Vec<f32> = match self.kind {
            ActivationKind::Relu => data.iter().map(|&x| x.max(0.0)).collect(),
            ActivationKind::LeakyRelu(alpha) => data
                .iter()
                .map(|&x| if x > 0.0 { x } else { alpha * x })
                .collect(),
            ActivationKind::Sigmoid => data.iter().map(|&x| sigmoid(x)).collect(),
            ActivationKind::Silu => data.iter().map(|&x| x * sigmoid(x)).collect(),
            ActivationKind::Gelu => data.iter().map(|&x| gelu(x)).collect(),
            ActivationKind::Softmax => {
                let dim = *input.shape().last().ok_or_else(|| {
                    GraphError::ComputationError("softmax 输入不能是 0D".to_string())
                })?;
                softmax_rows(data, dim)
            }
        };

        Ok(Tensor::new(&out_data, input.shape()))
    }
}
