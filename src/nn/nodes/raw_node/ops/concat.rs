/*
 * @Author       : 老董
 * @Date         : 2026-04-25
 * @Description  : 通道拼接节点：沿第 1 维（通道维）按父节点顺序拼接，
 *                 其余各维必须一致。Inception / Fire / OSA 等聚合
 *                 结构的汇合点，父节点顺序即输出通道顺序。
 */

use super::super::TraitNode;
use crate::nn::nodes::NodeHandle;
use crate::nn::GraphError;
use crate::tensor::Tensor;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// 拼接固定发生在第 1 维
const CONCAT_AXIS: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concat;

impl Concat {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TraitNode for Concat {
    fn type_name(&self) -> &'static str {
        "concat"
    }

    fn infer_shape(&self, parent_shapes: &[&[usize]]) -> Result<Vec<usize>, GraphError> {
        // 1. 验证父节点数量
        if parent_shapes.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "concat节点至少需要2个父节点，实际{}个",
                parent_shapes.len()
            )));
        }

        // 2. 验证各父节点同秩（至少 2D）且除通道维外各维一致
        let first = parent_shapes[0];
        if first.len() < 2 {
            return Err(GraphError::InvalidOperation(format!(
                "concat的父节点至少是 2D，得到 {first:?}"
            )));
        }
        let mut channels = first[CONCAT_AXIS];
        for shape in &parent_shapes[1..] {
            let rank_matches = shape.len() == first.len();
            let others_match = rank_matches
                && shape
                    .iter()
                    .zip(first)
                    .enumerate()
                    .all(|(axis, (&got, &expected))| axis == CONCAT_AXIS || got == expected);
            if !others_match {
                return Err(GraphError::ShapeMismatch {
                    expected: first.to_vec(),
                    got: shape.to_vec(),
                    message: "通道拼接要求除通道维外各维一致".to_string(),
                });
            }
            channels += shape[CONCAT_AXIS];
        }

        let mut out_shape = first.to_vec();
        out_shape[CONCAT_AXIS] = channels;
        Ok(out_shape)
    }

    fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        let mut views = Vec::with_capacity(parents.len());
        for index in 0..parents.len() {
            let value = super::super::parent_value(parents, index, self.type_name())?;
            views.push(value.data.view());
        }
        let data = ndarray::concatenate(Axis(CONCAT_AXIS), &views)
            .map_err(|e| GraphError::ComputationError(format!("通道拼接失败：{e}")))?;
        Ok(Tensor { data })
    }
}
