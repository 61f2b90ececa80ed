/*
 * @Author       : 老董
 * @Date         : 2026-04-18
 * @Description  : 张量模块：基于 ndarray 的 f32 动态维度张量
 *
 * 本 crate 只做推理与基准测量，张量因此保持精简：
 * - 构造（零值、全一、正态随机、显式数据）
 * - 形状/元素访问
 * - 节点计算核直接通过 `data` 字段使用 ndarray 的视图与广播
 */

use ndarray::{Array, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};


/// f32 动态维度张量。标量、向量、矩阵、高维数组统一用它表示。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor {
    pub(crate) data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 由显式数据与形状创建张量。`data` 的长度必须等于 `shape` 各维乘积。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "数据长度 {} 与形状 {:?} 不一致",
            data.len(),
            shape
        );
        let data = Array::from_shape_vec(IxDyn(shape), data.to_vec()).unwrap();
        Self { data }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: Array::ones(IxDyn(shape)),
        }
    }

    /// 创建一个空张量（0 个元素）。被禁用的偏置参数就以此形态持久化。
    pub fn empty() -> Self {
        Self {
            data: Array::zeros(IxDyn(&[0])),
        }
    }

    /// 创建服从正态分布 N(mean, std_dev²) 的随机张量（Box-Muller 变换）。
    pub fn new_normal(mean: f32, std_dev: f32, shape: &[usize]) -> Self {
        let mut rng = rand::thread_rng();
        Self::fill_normal(&mut rng, mean, std_dev, shape)
    }

    /// 带固定种子的正态随机张量，用于可复现的参数初始化。
    pub fn new_normal_seeded(mean: f32, std_dev: f32, shape: &[usize], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::fill_normal(&mut rng, mean, std_dev, shape)
    }

    fn fill_normal<R: Rng>(rng: &mut R, mean: f32, std_dev: f32, shape: &[usize]) -> Self {
        let len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(len);
        // Box-Muller：每轮产出两个独立正态样本
        while data.len() < len {
            let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
            let u2: f32 = rng.r#gen();
            let radius = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            data.push(mean + std_dev * radius * theta.cos());
            if data.len() < len {
                data.push(mean + std_dev * radius * theta.sin());
            }
        }
        Self::new(&data, shape)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 维度数（阶数）。
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 元素总数。
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 以切片形式访问底层数据（本 crate 的张量始终保持标准内存布局）。
    pub fn data_as_slice(&self) -> &[f32] {
        self.data.as_slice().unwrap()
    }

    /// 改变形状（元素数必须不变）。
    pub fn reshape(&self, shape: &[usize]) -> Self {
        assert_eq!(
            self.size(),
            shape.iter().product::<usize>(),
            "无法将形状 {:?} 改为 {:?}：元素数不一致",
            self.shape(),
            shape
        );
        let data = self.data.clone().into_shape(IxDyn(shape)).unwrap();
        Self { data }
    }
}

// ========== 索引 ==========

impl<I> std::ops::Index<I> for Tensor
where
    I: ndarray::NdIndex<IxDyn>,
{
    type Output = f32;

    fn index(&self, index: I) -> &f32 {
        &self.data[index]
    }
}

impl<I> std::ops::IndexMut<I> for Tensor
where
    I: ndarray::NdIndex<IxDyn>,
{
    fn index_mut(&mut self, index: I) -> &mut f32 {
        &mut self.data[index]
    }
}

// ========== 比较 ==========

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl approx::AbsDiffEq for Tensor {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}
