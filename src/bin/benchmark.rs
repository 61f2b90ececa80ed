/*
 * @Author       : 老董
 * @Date         : 2026-05-22
 * @Description  : 分类网络目录的推理基准驱动
 */

use std::process::ExitCode;

use clap::Parser;
use only_infer::arch::{ArchBuilder, classification_set};
use only_infer::benchmark::{BenchReport, BenchmarkOptions, LAUNCH_BLOCKING_ENV, LaunchMode, benchmark};
use only_infer::nn::blocks::Style;
use only_infer::nn::{Graph, GraphError};

/// 逐个实例化分类网络目录里的网络，测量单样本推理延迟并打印报告
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// 每批样本数
    #[arg(long, default_value_t = 1)]
    batch_size: usize,

    /// 输入图像边长（正方形）
    #[arg(long, default_value_t = 224)]
    image_size: usize,

    /// 计时迭代次数（另有固定趟数的预热）
    #[arg(long, default_value_t = 100)]
    num_iters: usize,

    /// 改用队列式前向提交（默认阻塞式）
    #[arg(long)]
    no_cuda_blocking: bool,
}

fn run_one(
    name: &str,
    builder: ArchBuilder,
    style: &Style,
    options: &BenchmarkOptions,
) -> Result<BenchReport, GraphError> {
    let mut graph = Graph::with_name(name.trim_end());
    let net = builder(&mut graph, options.batch_size, options.image_size, style)?;
    // 紧跟归一化的卷积偏置是冗余参数，推理前一律剔除
    graph.disable_duplicative_bias()?;
    benchmark(name, graph, net, options)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.no_cuda_blocking {
        // 环境变量是提交模式的唯一事实来源，旗标只是它的便捷写法
        unsafe { std::env::set_var(LAUNCH_BLOCKING_ENV, "0") };
    }
    let options = BenchmarkOptions {
        batch_size: cli.batch_size,
        image_size: cli.image_size,
        num_iters: cli.num_iters,
        launch_mode: LaunchMode::from_env(),
    };

    let style = Style::infer();
    let mut any_failed = false;
    for (name, builder) in classification_set() {
        match run_one(name, builder, &style, &options) {
            Ok(report) => println!("{report}"),
            Err(e) => {
                // 单个网络失败不中断整个目录，最后以非零码退出
                eprintln!("{}: {e}", name.trim_end());
                any_failed = true;
            }
        }
    }
    if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
