/*
 * @Author       : 老董
 * @Date         : 2026-04-20
 * @Description  : Graph 模块的错误类型
 */

use crate::nn::NodeId;
use thiserror::Error;

/// Graph 操作错误类型。
///
/// 构图期与执行期的所有失败都汇聚到这里，并一路向上传播到顶层驱动：
/// 这些都是架构定义中的结构性错误而非瞬态故障，不做任何局部重试。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// 积木实例化参数违反结构性前置条件（如通道数不能被头数整除、滤波器数为零）
    #[error("无效配置：{0}")]
    InvalidConfiguration(String),

    /// 跳连/残差引用了未绑定的标签名
    #[error("标签`{0}`在当前及外层作用域中均未绑定")]
    UnresolvedTag(String),

    #[error("节点{0:?}不存在")]
    NodeNotFound(NodeId),

    #[error("形状不匹配：预期{expected:?}，实际{got:?}（{message}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    ComputationError(String),

    #[error("节点名称重复：{0}")]
    DuplicateNodeName(String),

    /// 序列化/反序列化或文件读写失败
    #[error("IO错误：{0}")]
    Io(String),
}
