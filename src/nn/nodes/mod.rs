/*
 * @Author       : 老董
 * @Date         : 2026-04-22
 * @Description  : 节点模块：NodeId、NodeHandle 与各类原始节点
 */

mod node_handle;
pub(crate) mod raw_node;

pub use node_handle::{NodeHandle, NodeId};
pub use raw_node::{ActivationKind, LossKind};
pub(crate) use raw_node::{NodeType, TraitNode};
