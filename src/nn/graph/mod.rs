/*
 * @Author       : 老董
 * @Date         : 2026-04-27
 * @Description  : 计算图模块：图本体、节点创建、遍历改写、序列化。
 */

mod core;
mod describe;
mod error;
mod node_builders;
mod serialization;
mod visitor;

pub use core::Graph;
pub use error::GraphError;
