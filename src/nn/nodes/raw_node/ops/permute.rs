/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 维度重排节点：按给定的轴排列重排张量，
 *                 输出落回标准（行主序）布局。多头注意力里
 *                 [batch, seq, heads, dk] 与 [batch, heads, seq, dk]
 *                 的互换靠它完成。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use ndarray::IxDyn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permute {
    axes: Vec<usize>,
}

impl Permute {
    pub(crate) fn new(axes: &[usize]) -> Result<Self, GraphError> {
        // 验证 axes 是 0..rank 的一个排列
        let rank = axes.len();
        let mut seen = vec![false; rank];
        for &axis in axes {
            if axis >= rank || seen[axis] {
                return Err(GraphError::InvalidConfiguration(format!(
                    "维度重排的轴序必须是 0..{rank} 的一个排列，实际{axes:?}"
                )));
            }
            seen[axis] = true;
        }
        Ok(Self {
            axes: axes.to_vec(),
        })
    }
}

impl TraitNode for Permute {
    fn type_name(&self) -> &'static str {
        "permute"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        super::super::ensure_parents_len(parent_shapes, 1, self.type_name())?;
        let input_shape = parent_shapes[0];
        if input_shape.len() != self.axes.len() {
            return Err(GraphError::InvalidOperation(format!(
                "维度重排的轴数 {} 与输入秩 {} 不一致",
                self.axes.len(),
                input_shape.len()
            )));
        }
        Ok(self.axes.iter().map(|&a| input_shape[a]).collect())
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let input = super::super::parent_value(parents, 0, self.type_name())?;
        let permuted = input
            .data
            .clone()
            .permuted_axes(IxDyn(&self.axes));
        // 重排后布局不再连续，物化为标准布局
        Ok(Tensor {
            data: permuted.as_standard_layout().to_owned(),
        })
    }
}
