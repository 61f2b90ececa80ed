/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : 推理会话：阻塞式 / 队列式两种前向提交模式
 */

use std::sync::mpsc;
use std::thread;

use crate::nn::{Graph, GraphError, NodeId};

/// 控制前向提交模式的环境变量（对齐 CUDA_LAUNCH_BLOCKING 的习惯用法）
pub const LAUNCH_BLOCKING_ENV: &str = "ONLY_INFER_LAUNCH_BLOCKING";

/// 前向提交模式。
///
/// - `Blocking`：每次提交都在调用线程上同步算完才返回，计时最直白；
/// - `Queued`：提交只入队，由后台工作线程异步执行，须经 `synchronize`
///   设屏障后才能保证此前所有前向均已完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Blocking,
    Queued,
}

impl LaunchMode {
    /// 从环境变量读取：`"0"` 为队列式，`"1"` 或未设置为阻塞式
    pub fn from_env() -> Self {
        match std::env::var(LAUNCH_BLOCKING_ENV) {
            Ok(value) if value == "0" => Self::Queued,
            _ => Self::Blocking,
        }
    }
}

enum Command {
    Forward(NodeId),
    Sync(mpsc::Sender<Result<(), GraphError>>),
    Finish(mpsc::Sender<(Graph, Option<GraphError>)>),
}

enum Backend {
    Local(Graph),
    Remote {
        commands: mpsc::Sender<Command>,
        worker: thread::JoinHandle<()>,
    },
}

/// 推理会话：接管一张图，按 `LaunchMode` 执行前向。
///
/// 队列式下图被移交给后台线程，首个失败的前向会被记住（粘滞），
/// 在下一次 `synchronize` 时上抛。正常用法以 `finish` 收尾取回图；
/// 若会话被直接丢弃，命令通道关闭后工作线程会自行退出。
pub struct Session {
    backend: Backend,
}

impl Session {
    pub fn new(graph: Graph, mode: LaunchMode) -> Self {
        let backend = match mode {
            LaunchMode::Blocking => Backend::Local(graph),
            LaunchMode::Queued => {
                let (commands, inbox) = mpsc::channel();
                let worker = thread::spawn(move || worker_loop(graph, inbox));
                Backend::Remote { commands, worker }
            }
        };
        Self { backend }
    }

    /// 提交一次到`output`的前向。
    ///
    /// 阻塞式下错误当场上抛；队列式下本调用只入队，
    /// 执行中的错误要等 `synchronize` 才可见。
    pub fn dispatch_forward(&mut self, output: NodeId) -> Result<(), GraphError> {
        match &mut self.backend {
            Backend::Local(graph) => graph.forward(output),
            Backend::Remote { commands, .. } => commands
                .send(Command::Forward(output))
                .map_err(|_| worker_gone()),
        }
    }

    /// 同步屏障：等待此前提交的所有前向完成，并上抛其中首个错误。
    pub fn synchronize(&mut self) -> Result<(), GraphError> {
        match &mut self.backend {
            Backend::Local(_) => Ok(()),
            Backend::Remote { commands, .. } => {
                let (reply, outcome) = mpsc::channel();
                commands
                    .send(Command::Sync(reply))
                    .map_err(|_| worker_gone())?;
                outcome.recv().map_err(|_| worker_gone())?
            }
        }
    }

    /// 关闭会话并取回图；若有未上抛的粘滞错误则在此上抛。
    pub fn finish(self) -> Result<Graph, GraphError> {
        match self.backend {
            Backend::Local(graph) => Ok(graph),
            Backend::Remote { commands, worker } => {
                let (reply, outcome) = mpsc::channel();
                commands
                    .send(Command::Finish(reply))
                    .map_err(|_| worker_gone())?;
                let (graph, pending_error) = outcome.recv().map_err(|_| worker_gone())?;
                let _ = worker.join();
                match pending_error {
                    Some(e) => Err(e),
                    None => Ok(graph),
                }
            }
        }
    }
}

fn worker_gone() -> GraphError {
    GraphError::ComputationError("推理会话的工作线程已退出".to_string())
}

fn worker_loop(mut graph: Graph, inbox: mpsc::Receiver<Command>) {
    let mut first_error: Option<GraphError> = None;
    for command in inbox {
        match command {
            Command::Forward(output) => {
                // 出错后不再继续执行后续前向，错误粘滞到下一次屏障
                if first_error.is_none() {
                    if let Err(e) = graph.forward(output) {
                        first_error = Some(e);
                    }
                }
            }
            Command::Sync(reply) => {
                let outcome = match &first_error {
                    Some(e) => Err(e.clone()),
                    None => Ok(()),
                };
                let _ = reply.send(outcome);
            }
            Command::Finish(reply) => {
                let _ = reply.send((graph, first_error));
                return;
            }
        }
    }
}
