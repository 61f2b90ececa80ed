/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 词嵌入节点：按 token id 查表，[batch, seq] -> [batch, seq, D]。
 *                 id 以 f32 承载（图里只有一种元素类型），查表前四舍五入。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// 嵌入表 [V, D]
    table: Tensor,
}

impl Embedding {
    pub(crate) fn new(table: Tensor) -> Result<Self, GraphError> {
        if table.dimension() != 2 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0], // 占位
                got: table.shape().to_vec(),
                message: format!("嵌入表必须是 2D [V, D]，得到 {:?}", table.shape()),
            });
        }
        Ok(Self { table })
    }

    fn vocab_size(&self) -> usize {
        self.table.shape()[0]
    }

    fn dim(&self) -> usize {
        self.table.shape()[1]
    }
}

impl TraitNode for Embedding {
    fn type_name(&self) -> &'static str {
        "embedding"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() != 2 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0], // 占位
                got: input_shape.to_vec(),
                message: format!("嵌入输入必须是 2D [batch, seq]，得到 {input_shape:?}"),
            });
        }
        Ok(vec![input_shape[0], input_shape[1], self.dim()])
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let dim = self.dim();
        let vocab_size = self.vocab_size();
        let table_data = self.table.data_as_slice();

        let mut out_data = Vec::with_capacity(input.size() * dim);
        for &raw_id in input.data_as_slice() {
            let id = raw_id.round();
            if id < 0.0 || id >= vocab_size as f32 {
                return Err(GraphError::ComputationError(format!(
                    "嵌入索引 {raw_id} 不在词表范围 [0, {vocab_size}) 内"
                )));
            }
            let row = id as usize;
            out_data.extend_from_slice(&table_data[row * dim..(row + 1) * dim]);
        }

        let input_shape = input.shape();
        Ok(Tensor::new(
            &out_data,
            &[input_shape[0], input_shape[1], dim],
        ))
    }

    fn params_count(&self) -> usize {
        self.table.size()
    }
}
