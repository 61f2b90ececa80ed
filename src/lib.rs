//! # Only Infer
//!
//! `only_infer`项目旨在用纯rust打造一个轻便的深度网络推理基准框架：
//! 以可复用的结构母题（卷积段、残差、聚合、注意力）在计算图上组装
//! 从[AlexNet](https://papers.nips.cc/paper/4824-imagenet-classification-with-deep-convolutional-neural-networks)
//! 到 transformer 的经典骨干，用统一的图访问器做推理形态改写
//! （如归一化前的去重偏置），再对构出的网络做同步计时、吞吐与结构统计。
//!

pub mod arch;
pub mod benchmark;
pub mod nn;
pub mod tensor;
pub mod utils;
