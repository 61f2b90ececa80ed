/*
 * @Author       : 老董
 * @Date         : 2026-04-28
 * @Description  : 模型序列化：魔数 + 版本号 + bincode 载荷。
 *                 只持久化图名与节点表（含各节点自持的参数张量），
 *                 前向值、轮次号、RNG 都不落盘。
 */

use super::core::Graph;
use super::GraphError;
use crate::nn::nodes::NodeHandle;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

const MODEL_MAGIC: &[u8; 4] = b"OIPR";
const MODEL_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4;

/// 序列化视图：借用图的字段，避免落盘前整图克隆
#[derive(Serialize)]
struct SnapshotRef<'a> {
    name: &'a str,
    nodes: &'a [NodeHandle],
}

#[derive(Deserialize)]
struct Snapshot {
    name: String,
    nodes: Vec<NodeHandle>,
}

impl Graph {
    /// 序列化为字节流（含文件头）。字节数即模型的持久化体积。
    pub fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        let snapshot = SnapshotRef {
            name: &self.name,
            nodes: &self.nodes,
        };
        let payload = bincode::serialize(&snapshot)
            .map_err(|e| GraphError::Io(format!("模型序列化失败：{e}")))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MODEL_MAGIC);
        bytes.extend_from_slice(&MODEL_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        // 1. 验证文件头
        if bytes.len() < HEADER_LEN || &bytes[..4] != MODEL_MAGIC {
            return Err(GraphError::Io("不是 only_infer 模型格式".to_string()));
        }
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version_bytes);
        if version != MODEL_VERSION {
            return Err(GraphError::Io(format!(
                "不支持的模型版本：{version}（当前支持 {MODEL_VERSION}）"
            )));
        }

        // 2. 还原图。载入的图不带种子，轮次号归零。
        let snapshot: Snapshot = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| GraphError::Io(format!("模型反序列化失败：{e}")))?;
        Ok(Self {
            name: snapshot.name,
            nodes: snapshot.nodes,
            last_forward_pass_id: 0,
            rng: None,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let file = File::create(path.as_ref())
            .map_err(|e| GraphError::Io(format!("无法创建模型文件：{e}")))?;
        let mut writer = BufWriter::new(file);
        let bytes = self.to_bytes()?;
        writer
            .write_all(&bytes)
            .map_err(|e| GraphError::Io(format!("模型写入失败：{e}")))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let mut file = File::open(path.as_ref())
            .map_err(|e| GraphError::Io(format!("无法打开模型文件：{e}")))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| GraphError::Io(format!("模型读取失败：{e}")))?;
        Self::from_bytes(&bytes)
    }
}
