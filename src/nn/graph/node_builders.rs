/*
 * @Author       : 老董
 * @Date         : 2026-04-27
 * @Description  : 图的节点创建接口：每种节点一个 new_xxx_node 方法。
 *                 统一流程：读父节点形状 -> 构造原始节点 -> 形状推导
 *                 验证 -> 查重命名 -> 挂接父子关系 -> 入表返回 NodeId。
 *
 * 命名规则：
 * - 显式名重复即报 DuplicateNodeName；
 * - 不给名则自动命名为 {节点种类}_{计数}，计数从 1 起。
 */

use super::core::Graph;
use super::GraphError;
use crate::nn::nodes::raw_node::{
    Activation, ActivationKind, Add, Affine, AvgPool2d, BatchNorm, Concat, Conv2d, Dropout,
    Embedding, Extract, FullyConnected, GlobalAvgPool, Input, Loss, LossKind, MatMul, MaxPool2d,
    Multiply, NodeType, Permute, PositionalEncoding, Reshape, RmsNorm, ScaleConst, TraitNode,
    TrilMask, Upsample,
};
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;
use rand::Rng;

impl Graph {
    // ========== 入表与命名 ==========

    fn add_node_to_list(
        &mut self,
        raw_node: NodeType,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        // 1. 收集父节点形状并做形状推导（这里同时验证了父节点存在）
        let expected_shape = {
            let mut parent_shapes = Vec::with_capacity(parents.len());
            for &parent_id in parents {
                parent_shapes.push(self.get_node(parent_id)?.value_expected_shape());
            }
            raw_node.infer_shape(&parent_shapes)?
        };

        // 2. 确定节点名
        let node_name = match name {
            Some(explicit) => {
                if self.nodes.iter().any(|n| n.name() == explicit) {
                    return Err(GraphError::DuplicateNodeName(explicit.to_string()));
                }
                explicit.to_string()
            }
            None => {
                let type_name = raw_node.type_name();
                let mut counter = 1;
                loop {
                    let candidate = format!("{type_name}_{counter}");
                    if !self.nodes.iter().any(|n| n.name() == candidate) {
                        break candidate;
                    }
                    counter += 1;
                }
            }
        };

        // 3. 分配 id 并挂接父子关系
        let node_id = NodeId(self.nodes.len());
        for &parent_id in parents {
            self.get_node_mut(parent_id)?.add_child(node_id);
        }

        let mut handle = NodeHandle::new(raw_node, expected_shape, parents.to_vec());
        handle.bind_id_and_name(node_id, &node_name);
        self.nodes.push(handle);
        Ok(node_id)
    }

    /// 参数初始化：图带种子时从种子 RNG 派生，保证可复现
    fn init_normal(&mut self, mean: f32, std: f32, shape: &[usize]) -> Tensor {
        match &mut self.rng {
            Some(rng) => Tensor::new_normal_seeded(mean, std, shape, rng.r#gen()),
            None => Tensor::new_normal(mean, std, shape),
        }
    }

    // ========== 输入与输出 ==========

    pub fn new_input_node(&mut self, shape: &[usize], name: Option<&str>) -> Result<NodeId, GraphError> {
        let input = Input::new(shape)?;
        self.add_node_to_list(NodeType::Input(input), &[], name)
    }

    pub fn new_loss_node(
        &mut self,
        inputs: &[NodeId],
        kind: LossKind,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::Loss(Loss::new(kind)), inputs, name)
    }

    // ========== 带参数的层 ==========

    /// 2D 卷积。输入通道数取自父节点形状，卷积核按 He 初始化。
    #[allow(clippy::too_many_arguments)]
    pub fn new_conv2d_node(
        &mut self,
        input: NodeId,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        bias: bool,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let in_channels = {
            let shape = self.get_node(input)?.value_expected_shape();
            if shape.len() != 4 {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![0, 0, 0, 0], // 占位
                    got: shape.to_vec(),
                    message: "卷积的父节点必须是 4D [batch, C, H, W]".to_string(),
                });
            }
            shape[1]
        };

        let fan_in = (in_channels * kernel_size.0 * kernel_size.1) as f32;
        let kernel = self.init_normal(
            0.0,
            (2.0 / fan_in).sqrt(),
            &[out_channels, in_channels, kernel_size.0, kernel_size.1],
        );
        let mut conv = Conv2d::new(kernel, Tensor::zeros(&[out_channels]), stride, padding)?;
        if !bias {
            conv.disable_bias();
        }
        self.add_node_to_list(NodeType::Conv2d(conv), &[input], name)
    }

    /// 全连接。输入特征数取自父节点形状（4D 父节点按摊平算）。
    pub fn new_fully_connected_node(
        &mut self,
        input: NodeId,
        out_features: usize,
        bias: bool,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let in_features = {
            let shape = self.get_node(input)?.value_expected_shape();
            match shape.len() {
                2 | 3 => *shape.last().unwrap(),
                4 => shape[1] * shape[2] * shape[3],
                _ => {
                    return Err(GraphError::InvalidOperation(format!(
                        "全连接的父节点必须是 2D/3D/4D，得到 {shape:?}"
                    )));
                }
            }
        };

        let weight = self.init_normal(
            0.0,
            (2.0 / in_features as f32).sqrt(),
            &[out_features, in_features],
        );
        let mut fc = FullyConnected::new(weight, Tensor::zeros(&[out_features]))?;
        if !bias {
            fc.disable_bias();
        }
        self.add_node_to_list(NodeType::FullyConnected(fc), &[input], name)
    }

    pub fn new_batch_norm_node(&mut self, input: NodeId, name: Option<&str>) -> Result<NodeId, GraphError> {
        let channels = self.channel_count_of(input, "批归一化")?;
        let node = BatchNorm::new(Tensor::ones(&[channels]), Tensor::zeros(&[channels]))?;
        self.add_node_to_list(NodeType::BatchNorm(node), &[input], name)
    }

    pub fn new_affine_node(&mut self, input: NodeId, name: Option<&str>) -> Result<NodeId, GraphError> {
        let channels = self.channel_count_of(input, "仿射")?;
        let node = Affine::new(Tensor::ones(&[channels]), Tensor::zeros(&[channels]))?;
        self.add_node_to_list(NodeType::Affine(node), &[input], name)
    }

    pub fn new_rms_norm_node(&mut self, input: NodeId, name: Option<&str>) -> Result<NodeId, GraphError> {
        let dim = {
            let shape = self.get_node(input)?.value_expected_shape();
            *shape.last().ok_or_else(|| {
                GraphError::InvalidOperation("RMS 归一化的父节点不能是 0D".to_string())
            })?
        };
        let node = RmsNorm::new(Tensor::ones(&[dim]))?;
        self.add_node_to_list(NodeType::RmsNorm(node), &[input], name)
    }

    /// 词嵌入，嵌入表按小方差正态初始化
    pub fn new_embedding_node(
        &mut self,
        input: NodeId,
        vocab_size: usize,
        dim: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        if vocab_size == 0 || dim == 0 {
            return Err(GraphError::InvalidConfiguration(format!(
                "词表大小与嵌入维度必须为正，实际 vocab={vocab_size}、dim={dim}"
            )));
        }
        let table = self.init_normal(0.0, 0.01, &[vocab_size, dim]);
        self.add_node_to_list(NodeType::Embedding(Embedding::new(table)?), &[input], name)
    }

    // ========== 无参数的层 ==========

    pub fn new_max_pool2d_node(
        &mut self,
        input: NodeId,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = MaxPool2d::new(kernel_size, stride, padding)?;
        self.add_node_to_list(NodeType::MaxPool2d(node), &[input], name)
    }

    pub fn new_avg_pool2d_node(
        &mut self,
        input: NodeId,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = AvgPool2d::new(kernel_size, stride, padding)?;
        self.add_node_to_list(NodeType::AvgPool2d(node), &[input], name)
    }

    pub fn new_global_avg_pool_node(&mut self, input: NodeId, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::GlobalAvgPool(GlobalAvgPool::new()), &[input], name)
    }

    pub fn new_activation_node(
        &mut self,
        input: NodeId,
        kind: ActivationKind,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::Activation(Activation::new(kind)), &[input], name)
    }

    pub fn new_add_node(&mut self, inputs: &[NodeId], name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::Add(Add::new()), inputs, name)
    }

    pub fn new_multiply_node(
        &mut self,
        lhs: NodeId,
        rhs: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::Multiply(Multiply::new()), &[lhs, rhs], name)
    }

    pub fn new_concat_node(&mut self, inputs: &[NodeId], name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::Concat(Concat::new()), inputs, name)
    }

    pub fn new_mat_mul_node(
        &mut self,
        lhs: NodeId,
        rhs: NodeId,
        transpose_rhs: bool,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::MatMul(MatMul::new(transpose_rhs)), &[lhs, rhs], name)
    }

    pub fn new_extract_node(
        &mut self,
        input: NodeId,
        offset: usize,
        length: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Extract::new(offset, length)?;
        self.add_node_to_list(NodeType::Extract(node), &[input], name)
    }

    pub fn new_reshape_node(
        &mut self,
        input: NodeId,
        sample_shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Reshape::new(sample_shape)?;
        self.add_node_to_list(NodeType::Reshape(node), &[input], name)
    }

    pub fn new_permute_node(
        &mut self,
        input: NodeId,
        axes: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Permute::new(axes)?;
        self.add_node_to_list(NodeType::Permute(node), &[input], name)
    }

    pub fn new_scale_const_node(
        &mut self,
        input: NodeId,
        factor: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::ScaleConst(ScaleConst::new(factor)), &[input], name)
    }

    pub fn new_dropout_node(
        &mut self,
        input: NodeId,
        rate: f32,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Dropout::new(rate)?;
        self.add_node_to_list(NodeType::Dropout(node), &[input], name)
    }

    pub fn new_upsample_node(
        &mut self,
        input: NodeId,
        factor: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = Upsample::new(factor)?;
        self.add_node_to_list(NodeType::Upsample(node), &[input], name)
    }

    pub fn new_tril_mask_node(&mut self, input: NodeId, name: Option<&str>) -> Result<NodeId, GraphError> {
        self.add_node_to_list(NodeType::TrilMask(TrilMask::new()), &[input], name)
    }

    /// 正弦位置编码，编码维度取自父节点形状
    pub fn new_positional_encoding_node(
        &mut self,
        input: NodeId,
        max_len: usize,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let dim = {
            let shape = self.get_node(input)?.value_expected_shape();
            if shape.len() != 3 {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![0, 0, 0], // 占位
                    got: shape.to_vec(),
                    message: "位置编码的父节点必须是 3D [batch, seq, D]".to_string(),
                });
            }
            shape[2]
        };
        let node = PositionalEncoding::new(max_len, dim)?;
        self.add_node_to_list(NodeType::PositionalEncoding(node), &[input], name)
    }

    // ========== 私有辅助 ==========

    /// 读父节点的通道数（要求父节点是 4D）
    fn channel_count_of(&self, input: NodeId, what: &str) -> Result<usize, GraphError> {
        let shape = self.get_node(input)?.value_expected_shape();
        if shape.len() != 4 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![0, 0, 0, 0], // 占位
                got: shape.to_vec(),
                message: format!("{what}的父节点必须是 4D [batch, C, H, W]"),
            });
        }
        Ok(shape[1])
    }
}
