/*
 * @Author       : 老董
 * @Date         : 2026-05-02
 * @Description  : 标签注册表：作用域化的符号名 -> 节点映射。
 *                 跳连/拼接引用靠它回指早先创建的节点。
 *
 * 作用域规则：
 * - bind 永远写入最内层作用域，同名即遮蔽外层（合法且是刻意设计：
 *   同一块模板重复实例化时内部标签名是复用的）；
 * - resolve 从最内层向外逐层查找，取最近的绑定；
 * - 兄弟作用域互不可见，两次实例化同一块模板不会互相串标签。
 */

use crate::nn::nodes::NodeId;
use crate::nn::GraphError;
use std::collections::HashMap;

pub struct TagTable {
    scopes: Vec<HashMap<String, NodeId>>,
}

impl TagTable {
    /// 初始即带一个根作用域
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// 根作用域不可弹出
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// 绑定到最内层作用域，同名遮蔽外层绑定
    pub fn bind(&mut self, name: &str, node: NodeId) {
        // scopes 至少有根作用域，last_mut 不会落空
        if let Some(innermost) = self.scopes.last_mut() {
            innermost.insert(name.to_string(), node);
        }
    }

    /// 由内向外解析，找不到即 UnresolvedTag
    pub fn resolve(&self, name: &str) -> Result<NodeId, GraphError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .ok_or_else(|| GraphError::UnresolvedTag(name.to_string()))
    }
}

impl Default for TagTable {
    fn default() -> Self {
        Self::new()
    }
}
