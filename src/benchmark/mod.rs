/*
 * @Author       : 老董
 * @Date         : 2026-05-20
 * @Description  : 推理基准测试：预热、计时、统计与报告
 */

use std::fmt;
use std::time::Instant;

use crate::arch::BuiltNet;
use crate::nn::{Graph, GraphError};
use crate::tensor::Tensor;

mod session;
mod stats;

pub use session::{LAUNCH_BLOCKING_ENV, LaunchMode, Session};
pub use stats::RunningStats;


/// 正式计时前的预热趟数（不计入统计）
pub const WARM_UP_PASSES: usize = 10;

/// 一次基准测试的全部旋钮。
///
/// `batch_size`/`image_size` 同时喂给网络构造器；`num_iters` 是计时趟数。
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkOptions {
    pub batch_size: usize,
    pub image_size: usize,
    pub num_iters: usize,
    pub launch_mode: LaunchMode,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            image_size: 224,
            num_iters: 100,
            launch_mode: LaunchMode::Blocking,
        }
    }
}

/// 单个网络的基准报告，`Display` 输出驱动程序的标准单行格式。
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub name: String,
    /// 单趟前向的平均耗时（毫秒）
    pub mean_ms: f64,
    /// 吞吐量：每秒处理的样本数（含 batch 折算）
    pub fps: f64,
    /// 可学习参数总量
    pub params: usize,
    /// 序列化后的体积（MiB）
    pub mib: f64,
    pub convolutions: usize,
    pub layers: usize,
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inference: {:.3} ms ({:.3} fps) #params: {} (memory usage: {:.3} MiB) #num convolutions: {} #num layers: {}",
            self.name,
            self.mean_ms,
            self.fps,
            self.params,
            self.mib,
            self.convolutions,
            self.layers
        )
    }
}

/// 对一张已构好的图做端到端推理基准。
///
/// 流程：
/// 1. 按输入节点的预期形状物化一个全零批次（只物化一次，各趟复用）；
/// 2. 以 `options.launch_mode` 开启会话，先跑 [`WARM_UP_PASSES`] 趟预热；
/// 3. 计时 `num_iters` 趟，每趟在取终点时间戳之前先过同步屏障，
///    保证队列式下测到的是真实完成时间；
/// 4. 收回图，统计参数量、序列化体积与节点构成。
///
/// 任何一趟前向失败都会中止整个基准并上抛错误。
pub fn benchmark(
    name: &str,
    mut graph: Graph,
    net: BuiltNet,
    options: &BenchmarkOptions,
) -> Result<BenchReport, GraphError> {
    let input_shape = graph.get_node_value_expected_shape(net.input)?.to_vec();
    graph.set_node_value(net.input, Tensor::zeros(&input_shape))?;

    let mut session = Session::new(graph, options.launch_mode);

    // ========== 预热 ==========
    for _ in 0..WARM_UP_PASSES {
        session.dispatch_forward(net.output)?;
    }
    session.synchronize()?;

    // ========== 计时 ==========
    let mut stats = RunningStats::new();
    for _ in 0..options.num_iters {
        let begin = Instant::now();
        session.dispatch_forward(net.output)?;
        session.synchronize()?;
        stats.add(begin.elapsed().as_secs_f64() * 1e3);
    }

    let graph = session.finish()?;

    // ========== 统计 ==========
    let mean_ms = stats.mean();
    let fps = if mean_ms > 0.0 {
        1e3 / mean_ms * options.batch_size as f64
    } else {
        0.0
    };
    let mib = graph.to_bytes()?.len() as f64 / 1024.0 / 1024.0;

    Ok(BenchReport {
        name: name.to_string(),
        mean_ms,
        fps,
        params: graph.params_count(),
        mib,
        convolutions: graph.convolutions_count(),
        layers: graph.layers_count(),
    })
}
