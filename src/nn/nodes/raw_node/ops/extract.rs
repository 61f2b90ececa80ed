/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 切片抽取节点：沿最后一维取 [offset, offset+length) 区间。
 *                 注意力块用它从合并投影的输出里拆出 Q/K/V。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extract {
    offset: usize,
    length: usize,
}

impl Extract {
    pub(crate) fn new(offset: usize, length: usize) -> Result<Self, GraphError> {
        if length == 0 {
            return Err(GraphError::InvalidConfiguration(
                "抽取长度必须为正".to_string(),
            ));
        }
        Ok(Self { offset, length })
    }
}

impl TraitNode for Extract {
    fn type_name(&self) -> &'static str {
        "extract"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        let last = *input_shape.last().ok_or_else(|| {
            GraphError::InvalidOperation("extract 输入不能是 0D".to_string())
        })?;

        if self.offset + self.length > last {
            return Err(GraphError::InvalidConfiguration(format!(
                "抽取区间 [{}, {}) 超出最后一维长度 {last}",
                self.offset,
                self.offset + self.length
            )));
        }

        let mut out_shape = input_shape.to_vec();
        *out_shape.last_mut().unwrap() = self.length;
        Ok(out_shape)
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let dim = *input.shape().last().unwrap();
        let data = input.data_as_slice();

        let mut out_data = Vec::with_capacity(data.len() / dim * self.length);
        for row in data.chunks(dim) {
            out_data.extend_from_slice(&row[self.offset..self.offset + self.length]);
        }

        let mut out_shape = input.shape().to_vec();
        *out_shape.last_mut().unwrap() = self.length;
        Ok(Tensor::new(&out_data, &out_shape))
    }
}
