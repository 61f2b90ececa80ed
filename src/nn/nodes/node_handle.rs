/*
 * @Author       : 老董
 * @Date         : 2026-04-22
 * @Description  : 节点句柄：持有节点的图内元数据（id、名称、父子关系、预期形状）
 *                 与具体的原始节点，前向值与前向轮次号不参与序列化。
 */

use super::raw_node::{NodeType, TraitNode};
use crate::nn::GraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 节点在图内的唯一标识，即节点表中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHandle {
    id: NodeId,
    name: String,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
    /// 构建期推导出的输出形状，前向传播产出的值必与其一致
    expected_shape: Vec<usize>,
    raw_node: NodeType,
    /// 前向传播的计算结果，不属于模型本体
    #[serde(skip)]
    value: Option<Tensor>,
    /// 本节点最近一次参与的前向轮次号，用于同轮去重
    #[serde(skip)]
    last_forward_pass_id: u64,
}

impl NodeHandle {
    pub(crate) fn new(raw_node: NodeType, expected_shape: Vec<usize>, parents: Vec<NodeId>) -> Self {
        Self {
            id: NodeId(0),
            name: String::new(),
            parents,
            children: Vec::new(),
            expected_shape,
            raw_node,
            value: None,
            last_forward_pass_id: 0,
        }
    }

    /// 由图在入表时回填id与（已查重的）名称
    pub(crate) fn bind_id_and_name(&mut self, id: NodeId, name: &str) {
        self.id = id;
        self.name = name.to_string();
    }

    // ========== 基本访问器 ==========

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn value_expected_shape(&self) -> &[usize] {
        &self.expected_shape
    }

    pub fn type_name(&self) -> &'static str {
        self.raw_node.type_name()
    }

    pub(crate) fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub fn params_count(&self) -> usize {
        self.raw_node.params_count()
    }

    pub(crate) fn last_forward_pass_id(&self) -> u64 {
        self.last_forward_pass_id
    }

    pub(crate) fn set_last_forward_pass_id(&mut self, pass_id: u64) {
        self.last_forward_pass_id = pass_id;
    }

    // ========== 种类判别 ==========

    pub fn is_input(&self) -> bool {
        matches!(self.raw_node, NodeType::Input(_))
    }

    pub fn is_loss(&self) -> bool {
        matches!(self.raw_node, NodeType::Loss(_))
    }

    pub fn is_convolution(&self) -> bool {
        matches!(self.raw_node, NodeType::Conv2d(_))
    }

    pub fn is_normalization(&self) -> bool {
        matches!(self.raw_node, NodeType::BatchNorm(_) | NodeType::Affine(_))
    }

    /// 本节点是否携带仍处于启用状态的偏置
    pub fn has_enabled_bias(&self) -> bool {
        match &self.raw_node {
            NodeType::Conv2d(conv) => conv.bias_enabled(),
            NodeType::FullyConnected(fc) => fc.bias_enabled(),
            _ => false,
        }
    }

    // ========== 值的读写与计算 ==========

    /// 为输入节点赋值。仅输入节点可被外部赋值，且形状必须与声明一致。
    pub fn set_value(&mut self, value: Tensor) -> Result<(), GraphError> {
        if !self.is_input() {
            return Err(GraphError::InvalidOperation(format!(
                "节点[{}]不是输入节点，无法直接赋值",
                self.name
            )));
        }
        if value.shape() != self.expected_shape {
            return Err(GraphError::ShapeMismatch {
                expected: self.expected_shape.clone(),
                got: value.shape().to_vec(),
                message: format!("输入节点[{}]的值形状与声明不符", self.name),
            });
        }
        self.value = Some(value);
        Ok(())
    }

    /// 记录前向传播算出的值（不做形状检查，形状由构建期推导保证）
    pub(crate) fn store_value(&mut self, value: Tensor) {
        self.value = Some(value);
    }

    pub(crate) fn calc_value_by_parents(&self, parents: &[&NodeHandle]) -> Result<Tensor, GraphError> {
        self.raw_node.calc_value_by_parents(parents)
    }

    /// 禁用本节点的偏置（仅卷积与全连接节点持有偏置）
    pub(crate) fn disable_bias(&mut self) -> Result<(), GraphError> {
        match &mut self.raw_node {
            NodeType::Conv2d(conv) => {
                conv.disable_bias();
                Ok(())
            }
            NodeType::FullyConnected(fc) => {
                fc.disable_bias();
                Ok(())
            }
            _ => Err(GraphError::InvalidOperation(format!(
                "节点[{}]不携带偏置，无法禁用",
                self.name
            ))),
        }
    }
}
