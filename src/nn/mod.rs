/*
 * @Author       : 老董
 * @Date         : 2026-04-28
 * @Description  : 负责神经网络计算图的构建（nodes/graph）、
 *                 结构母题组装（blocks）与图级变换。
 */

pub mod blocks;
mod graph;
mod nodes;

pub use graph::{Graph, GraphError};
pub use nodes::{ActivationKind, LossKind, NodeHandle, NodeId};

#[cfg(test)]
mod tests;
