/*
 * @Author       : 老董
 * @Date         : 2026-04-28
 * @Description  : 图结构的人读摘要，调试网络拼装时用。
 */

use super::core::Graph;

impl Graph {
    /// 按创建顺序列出全部节点：id、名称、种类、输出形状、参数数
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "图[{}]：{} 个节点，{} 个参数\n",
            self.name,
            self.nodes_count(),
            self.params_count()
        ));
        out.push_str(&format!(
            "{:<6} {:<28} {:<22} {:<22} {:>12}\n",
            "id", "name", "type", "output_shape", "params"
        ));
        for node in &self.nodes {
            out.push_str(&format!(
                "{:<6} {:<28} {:<22} {:<22} {:>12}\n",
                node.id().0,
                node.name(),
                node.type_name(),
                format!("{:?}", node.value_expected_shape()),
                node.params_count()
            ));
        }
        out
    }
}
