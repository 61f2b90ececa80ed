/*
 * @Author       : 老董
 * @Date         : 2026-04-28
 * @Description  : 图的遍历与改写 pass。遍历顺序固定为节点创建顺序，
 *                 与图的拓扑或名称无关，因此同一张图上跑多少次
 *                 结果都一致。
 */

use super::core::Graph;
use super::GraphError;
use crate::nn::nodes::{NodeHandle, NodeId};

impl Graph {
    /// 按创建顺序访问所有满足谓词的节点，逐个施加动作
    pub fn visit_nodes<P, A>(&mut self, predicate: P, mut action: A) -> Result<usize, GraphError>
    where
        P: Fn(&NodeHandle) -> bool,
        A: FnMut(&mut NodeHandle) -> Result<(), GraphError>,
    {
        let mut visited = 0;
        for node in &mut self.nodes {
            if predicate(node) {
                action(node)?;
                visited += 1;
            }
        }
        Ok(visited)
    }

    /// 统计满足谓词的节点数
    pub fn count_nodes<P>(&self, predicate: P) -> usize
    where
        P: Fn(&NodeHandle) -> bool,
    {
        self.nodes.iter().filter(|n| predicate(n)).count()
    }

    /// 卷积节点总数
    pub fn convolutions_count(&self) -> usize {
        self.count_nodes(NodeHandle::is_convolution)
    }

    /// 网络层数：输入与损失不算层
    pub fn layers_count(&self) -> usize {
        self.count_nodes(|n| !n.is_input() && !n.is_loss())
    }

    /// 去掉被归一化抵消的偏置：凡是带偏置的卷积/全连接节点，
    /// 只要它的全部子节点都是归一化（批归一化/仿射），就禁用其偏置。
    /// 归一化先减均值，上游偏置加多少都会被消掉；
    /// 但凡有一个子节点不做归一化，偏置就仍然可见，必须保留。
    /// 返回本次被禁用偏置的节点数。重复执行是幂等的。
    pub fn disable_duplicative_bias(&mut self) -> Result<usize, GraphError> {
        // 先收集再改写，避免一边遍历一边改
        let mut targets: Vec<NodeId> = Vec::new();
        for node in &self.nodes {
            if !node.has_enabled_bias() || node.children().is_empty() {
                continue;
            }
            let mut absorbed = true;
            for child_id in node.children() {
                if !self.get_node(*child_id)?.is_normalization() {
                    absorbed = false;
                    break;
                }
            }
            if absorbed {
                targets.push(node.id());
            }
        }

        let disabled = targets.len();
        for node_id in targets {
            self.get_node_mut(node_id)?.disable_bias()?;
        }
        Ok(disabled)
    }
}
