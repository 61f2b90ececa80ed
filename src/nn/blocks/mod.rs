/*
 * @Author       : 老董
 * @Date         : 2026-05-02
 * @Description  : 块组装层：在计算图上搭可复用的结构母题
 *                 （卷积段、残差、聚合、注意力），配合标签注册表
 *                 表达跳连，配合 Style 在训练/推理两种形态间切换。
 */

mod aggregate;
mod attention;
mod conv;
mod residual;
mod tags;

pub use aggregate::{csp_block, dense_layer, dense_transition, fire_module, inception_block, osa_module, sppf};
pub use attention::{feed_forward, multihead_attention, token_embeddings, transformer_block};
pub use conv::{conv_block, conv_norm};
pub use residual::{darknet_residual, repvgg_block, residual_basic, residual_bottleneck};
pub use tags::TagTable;

use crate::nn::nodes::{ActivationKind, NodeId};
use crate::nn::{Graph, GraphError};

// ========== 组装器 ==========

/// 块组装器：对图的可变借用 + 标签注册表。
/// 块构建函数都经由它创建节点、绑定与解析标签。
pub struct Composer<'g> {
    graph: &'g mut Graph,
    tags: TagTable,
}

impl<'g> Composer<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self {
            graph,
            tags: TagTable::new(),
        }
    }

    pub fn graph(&mut self) -> &mut Graph {
        self.graph
    }

    pub fn bind(&mut self, name: &str, node: NodeId) {
        self.tags.bind(name, node);
    }

    pub fn resolve(&self, name: &str) -> Result<NodeId, GraphError> {
        self.tags.resolve(name)
    }

    pub fn scope_depth(&self) -> usize {
        self.tags.depth()
    }

    /// 在新作用域里执行一段组装逻辑，退出时无论成败都弹出作用域
    pub fn scoped<T, F>(&mut self, f: F) -> Result<T, GraphError>
    where
        F: FnOnce(&mut Self) -> Result<T, GraphError>,
    {
        self.tags.push_scope();
        let result = f(self);
        self.tags.pop_scope();
        result
    }
}

/// 把一个块连续堆叠 count 次，前一次的输出是后一次的输入。
/// 每次迭代都在独立作用域里实例化，内部标签不跨迭代泄漏。
/// count = 0 时不建任何节点，原样返回输入。
pub fn repeat<F>(
    c: &mut Composer,
    input: NodeId,
    count: usize,
    mut block: F,
) -> Result<NodeId, GraphError>
where
    F: FnMut(&mut Composer, NodeId) -> Result<NodeId, GraphError>,
{
    let mut current = input;
    for _ in 0..count {
        current = c.scoped(|c| block(c, current))?;
    }
    Ok(current)
}

// ========== 形态风格 ==========

/// 归一化形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormForm {
    /// 训练形态：批归一化
    Batch,
    /// 推理形态：逐通道仿射（批归一化折叠后的样子）
    Affine,
    /// 无归一化（AlexNet/SqueezeNet 一类的老式网络）
    None,
}

/// 随机失活形态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropoutForm {
    /// 训练形态：以给定概率随机置零
    Random(f32),
    /// 推理形态：按保留率定值缩放
    Scale(f32),
}

/// 网络形态风格：激活函数、归一化形态与随机失活形态的一组选择。
/// 同一套块构建代码，换一个 Style 就在训练形态与推理形态之间切换。
#[derive(Debug, Clone)]
pub struct Style {
    activation: ActivationKind,
    norm: NormForm,
    dropout: DropoutForm,
}

impl Style {
    /// 训练形态：批归一化 + 随机失活（默认失活率 0.5）
    pub fn train() -> Self {
        Self {
            activation: ActivationKind::Relu,
            norm: NormForm::Batch,
            dropout: DropoutForm::Random(0.5),
        }
    }

    /// 推理形态：仿射 + 定值缩放（默认保留率 0.5）
    pub fn infer() -> Self {
        Self {
            activation: ActivationKind::Relu,
            norm: NormForm::Affine,
            dropout: DropoutForm::Scale(0.5),
        }
    }

    pub fn with_activation(mut self, kind: ActivationKind) -> Self {
        self.activation = kind;
        self
    }

    pub fn with_norm(mut self, form: NormForm) -> Self {
        self.norm = form;
        self
    }

    /// 换失活率，形态保持不变（Scale 形态换算成保留率）
    pub fn with_dropout_rate(mut self, rate: f32) -> Self {
        self.dropout = match self.dropout {
            DropoutForm::Random(_) => DropoutForm::Random(rate),
            DropoutForm::Scale(_) => DropoutForm::Scale(1.0 - rate),
        };
        self
    }

    pub fn activation_kind(&self) -> ActivationKind {
        self.activation
    }

    pub fn norm_form(&self) -> NormForm {
        self.norm
    }

    pub fn dropout_form(&self) -> DropoutForm {
        self.dropout
    }

    /// 按当前风格加激活节点
    pub fn activation(&self, c: &mut Composer, input: NodeId) -> Result<NodeId, GraphError> {
        c.graph().new_activation_node(input, self.activation, None)
    }

    /// 按当前形态加归一化节点；None 形态不建节点，原样返回
    pub fn norm(&self, c: &mut Composer, input: NodeId) -> Result<NodeId, GraphError> {
        match self.norm {
            NormForm::Batch => c.graph().new_batch_norm_node(input, None),
            NormForm::Affine => c.graph().new_affine_node(input, None),
            NormForm::None => Ok(input),
        }
    }

    /// 按当前形态加随机失活节点
    pub fn dropout(&self, c: &mut Composer, input: NodeId) -> Result<NodeId, GraphError> {
        match self.dropout {
            DropoutForm::Random(rate) => c.graph().new_dropout_node(input, rate, None),
            DropoutForm::Scale(factor) => c.graph().new_scale_const_node(input, factor, None),
        }
    }
}

// ========== 公共校验 ==========

/// 结构参数必须为正，违例即 InvalidConfiguration
pub(crate) fn ensure_positive(value: usize, what: &str) -> Result<(), GraphError> {
    if value == 0 {
        return Err(GraphError::InvalidConfiguration(format!("{what}必须为正")));
    }
    Ok(())
}

/// 读节点输出的通道数（要求 4D）
pub(crate) fn channels_of(c: &Composer, node: NodeId) -> Result<usize, GraphError> {
    let shape = c.graph.get_node_value_expected_shape(node)?;
    if shape.len() != 4 {
        return Err(GraphError::ShapeMismatch {
            expected: vec![0, 0, 0, 0], // 占位
            got: shape.to_vec(),
            message: "该块要求 4D [batch, C, H, W] 输入".to_string(),
        });
    }
    Ok(shape[1])
}

/// 读节点输出的序列长与特征维（要求 3D）
pub(crate) fn token_dims_of(c: &Composer, node: NodeId) -> Result<(usize, usize), GraphError> {
    let shape = c.graph.get_node_value_expected_shape(node)?;
    match shape {
        [_, seq_len, dim] => Ok((*seq_len, *dim)),
        other => Err(GraphError::ShapeMismatch {
            expected: vec![0, 0, 0], // 占位
            got: other.to_vec(),
            message: "该块要求 3D [batch, seq, dim] 输入".to_string(),
        }),
    }
}
