/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 批量矩阵乘法节点：对最后两维做矩阵乘，前导维逐一配对。
 *                 可选转置右操作数（注意力里的 Q·Kᵀ 直接用它，免去
 *                 额外的 Permute 节点）。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatMul {
    /// 为真时右操作数按 [..., n, k] 解读并转置参与乘法
    transpose_rhs: bool,
}

impl MatMul {
    pub(crate) fn new(transpose_rhs: bool) -> Self {
        Self { transpose_rhs }
    }
}

impl TraitNode for MatMul {
    fn type_name(&self) -> &'static str {
        "mat_mul"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 2, self.type_name())?;
        let (lhs, rhs) = (parent_shapes[0], parent_shapes[1]);

        // 1. 验证秩：两侧至少 2D 且同秩
        if lhs.len() < 2 || lhs.len() != rhs.len() {
            return Err(GraphError::InvalidOperation(format!(
                "矩阵乘法要求两侧同秩且至少 2D，得到 {lhs:?} 与 {rhs:?}"
            )));
        }

        // 2. 验证前导维一致
        let lead = lhs.len() - 2;
        if lhs[..lead] != rhs[..lead] {
            return Err(GraphError::ShapeMismatch {
                expected: lhs[..lead].to_vec(),
                got: rhs[..lead].to_vec(),
                message: "矩阵乘法的前导维必须一致".to_string(),
            });
        }

        // 3. 验证收缩维匹配
        let (m, k) = (lhs[lead], lhs[lead + 1]);
        let (rhs_rows, rhs_cols) = (rhs[lead], rhs[lead + 1]);
        let (k2, n) = if self.transpose_rhs {
            (rhs_cols, rhs_rows)
        } else {
            (rhs_rows, rhs_cols)
        };
        if k != k2 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![k],
                got: vec![k2],
                message: "矩阵乘法的收缩维不匹配".to_string(),
            });
        }

        let mut out_shape = lhs[..lead].to_vec();
        out_shape.push(m);
        out_shape.push(n);
        Ok(out_shape)
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let lhs = super::super::parent_value(parents, 0, self.type_name())?;
        let rhs = super::super::parent_value(parents, 1, self.type_name())?;

        let lhs_shape = lhs.shape();
        let rhs_shape = rhs.shape();
        let lead = lhs_shape.len() - 2;
        let (m, k) = (lhs_shape[lead], lhs_shape[lead + 1]);
        let n = if self.transpose_rhs {
            rhs_shape[lead]
        } else {
            rhs_shape[lead + 1]
        };
        let batches: usize = lhs_shape[..lead].iter().product();

        let lhs_data = lhs.data_as_slice();
        let rhs_data = rhs.data_as_slice();
        let lhs_mat_size = m * k;
        let rhs_mat_size = rhs_shape[lead] * rhs_shape[lead + 1];
        let transpose_rhs = self.transpose_rhs;

        // 前导维摊平后并行，各自做一个 [m,k]·[k,n] 小矩阵乘
        let batch_results: Vec<Vec<f32>> = (0..batches)
            .into_par_iter()
            .map(|bi| {
                let a = &lhs_data[bi * lhs_mat_size..(bi + 1) * lhs_mat_size];
                let b = &rhs_data[bi * rhs_mat_size..(bi + 1) * rhs_mat_size];
                let mut out = vec![0.0f32; m * n];
                for i in 0..m {
                    for j in 0..n {
                        let mut sum = 0.0f32;
                        if transpose_rhs {
                            // b 为 [n, k]，按行取即是转置后的列
                            for x in 0..k {
                                sum += a[i * k + x] * b[j * k + x];
                            }
                        } else {
                            for x in 0..k {
                                sum += a[i * k + x] * b[x * n + j];
                            }
                        }
                        out[i * n + j] = sum;
                    }
                }
                out
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        let mut out_shape = lhs_shape[..lead].to_vec();
        out_shape.push(m);
        out_shape.push(n);
        Ok(Tensor::new(&all_data, &out_shape))
    }
}
