/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 正弦位置编码节点：构造时预生成 [max_len, D] 编码表，
 *                 前向时加到输入的每个位置上。表不是训练参数。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionalEncoding {
    /// 预生成的编码表 [max_len, D]
    table: Tensor,
}

impl PositionalEncoding {
    pub(crate) fn new(max_len: usize, dim: usize) -> Result<Self, GraphError> {
        if max_len == 0 || dim == 0 {
            return Err(GraphError::InvalidConfiguration(format!(
                "位置编码的 max_len 与维度必须为正，实际 max_len={max_len}、dim={dim}"
            )));
        }

        // sin/cos 交替：偶数维 sin(pos/10000^(i/D))，奇数维取同频 cos
        let mut data = vec![0.0f32; max_len * dim];
        for pos in 0..max_len {
            for i in (0..dim).step_by(2) {
                let freq = 1.0 / 10000f32.powf(i as f32 / dim as f32);
                let angle = pos as f32 * freq;
                data[pos * dim + i] = angle.sin();
                if i + 1 < dim {
                    data[pos * dim + i + 1] = angle.cos();
                }
            }
        }

        Ok(Self {
            table: Tensor::new(&data, &[max_len, dim]),
        })
    }

    fn max_len(&self) -> usize {
        self.table.shape()[0]
    }

    fn dim(&self) -> usize {
        self.table.shape()[1]
    }
}

impl TraitNode for PositionalEncoding {
    fn type_name(&self) -> &'static str {
        "positional_encoding"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() != 3 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!("位置编码输入必须是 3D [batch, seq, D]，得到 {input_shape:?}"),
            });
        }
        if input_shape[1] > self.max_len() {
            return Err(GraphError::InvalidConfiguration(format!(
                "序列长度 {} 超出位置编码表上限 {}",
                input_shape[1],
                self.max_len()
            )));
        }
        if input_shape[2] != self.dim() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.dim()],
                got: vec![input_shape[2]],
                message: "位置编码表的维度与输入不匹配".to_string(),
            });
        }
        Ok(input_shape.to_vec())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let input_shape = input.shape();
        let (batch_size, seq_len, dim) = (input_shape[0], input_shape[1], input_shape[2]);
        let table_data = self.table.data_as_slice();

        let data = input.data_as_slice();
        let mut out_data = Vec::with_capacity(data.len());
        for b in 0..batch_size {
            let sample = &data[b * seq_len * dim..(b + 1) * seq_len * dim];
            for (pos, row) in sample.chunks(dim).enumerate() {
                let code = &table_data[pos * dim..(pos + 1) * dim];
                out_data.extend(row.iter().zip(code).map(|(&x, &p)| x + p));
            }
        }
        Ok(Tensor::new(&out_data, input_shape))
    }
}
