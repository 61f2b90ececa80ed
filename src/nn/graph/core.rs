/*
 * @Author       : 老董
 * @Date         : 2026-04-27
 * @Description  : 计算图本体：节点表、前向传播与基础访问器。
 *
 * 设计决策：
 * - 节点存放在 Vec 里，NodeId 即下标，创建顺序天然就是遍历顺序；
 * - 前向传播带轮次号去重：同一轮里被多个子节点共享的父节点只算一次
 *  （残差/拼接结构下这是正确性问题，不只是性能问题）；
 * - 图可携带种子 RNG，参数初始化经由它派生，保证同种子同参数。
 */

use super::GraphError;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug)]
pub struct Graph {
    pub(super) name: String,
    pub(super) nodes: Vec<NodeHandle>,
    pub(super) last_forward_pass_id: u64,
    pub(super) rng: Option<StdRng>,
}

impl Graph {
    // ========== 构造 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
            last_forward_pass_id: 0,
            rng: None,
        }
    }

    /// 带种子构造：同种子构出的图参数完全一致
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_name_and_seed("default_graph", seed)
    }

    pub fn with_name_and_seed(name: &str, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
            last_forward_pass_id: 0,
            rng: Some(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn has_seed(&self) -> bool {
        self.rng.is_some()
    }

    // ========== 基础访问器 ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    /// 全图可训练参数元素总数
    pub fn params_count(&self) -> usize {
        self.nodes.iter().map(|n| n.params_count()).sum()
    }

    pub fn get_node(&self, node_id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(node_id.0).ok_or(GraphError::NodeNotFound(node_id))
    }

    pub(crate) fn get_node_mut(&mut self, node_id: NodeId) -> Result<&mut NodeHandle, GraphError> {
        self.nodes
            .get_mut(node_id.0)
            .ok_or(GraphError::NodeNotFound(node_id))
    }

    pub(crate) fn get_nodes(&self, node_ids: &[NodeId]) -> Result<Vec<&NodeHandle>, GraphError> {
        node_ids.iter().map(|&id| self.get_node(id)).collect()
    }

    pub fn get_node_name(&self, node_id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(node_id)?.name())
    }

    pub fn get_node_parents(&self, node_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        Ok(self.get_node(node_id)?.parents().to_vec())
    }

    pub fn get_node_children(&self, node_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        Ok(self.get_node(node_id)?.children().to_vec())
    }

    pub fn get_node_value(&self, node_id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(node_id)?.value())
    }

    pub fn get_node_value_expected_shape(&self, node_id: NodeId) -> Result<&[usize], GraphError> {
        Ok(self.get_node(node_id)?.value_expected_shape())
    }

    /// 为输入节点赋值（只有输入节点接受外部赋值）
    pub fn set_node_value(&mut self, node_id: NodeId, value: Tensor) -> Result<(), GraphError> {
        self.get_node_mut(node_id)?.set_value(value)
    }

    // ========== 前向传播 ==========

    /// 对目标节点做一轮前向传播：自底向上算出它依赖的全部节点。
    /// 同一轮里被共享的父节点只计算一次。
    pub fn forward(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        self.last_forward_pass_id += 1;
        let pass_id = self.last_forward_pass_id;
        self.forward_node_internal(node_id, pass_id)
    }

    fn forward_node_internal(&mut self, node_id: NodeId, pass_id: u64) -> Result<(), GraphError> {
        // 1. 本轮已算过则直接复用
        if self.get_node(node_id)?.last_forward_pass_id() == pass_id {
            return Ok(());
        }

        // 2. 输入节点不计算，只验证已被赋值
        if self.get_node(node_id)?.is_input() {
            if !self.get_node(node_id)?.has_value() {
                return Err(GraphError::InvalidOperation(format!(
                    "输入节点[{}]在前向传播前必须先赋值",
                    self.get_node(node_id)?.name()
                )));
            }
            self.get_node_mut(node_id)?.set_last_forward_pass_id(pass_id);
            return Ok(());
        }

        // 3. 先递归算完所有父节点
        let parents = self.get_node(node_id)?.parents().to_vec();
        for &parent_id in &parents {
            self.forward_node_internal(parent_id, pass_id)?;
        }

        // 4. 再算本节点
        let value = {
            let parent_refs = self.get_nodes(&parents)?;
            self.get_node(node_id)?.calc_value_by_parents(&parent_refs)?
        };
        let node = self.get_node_mut(node_id)?;
        node.store_value(value);
        node.set_last_forward_pass_id(pass_id);
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
