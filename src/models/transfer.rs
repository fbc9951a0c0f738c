// 文件传输相关类型
// 远程文件条目、单文件结果与整批传输报告

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 远程文件条目（由 RemoteGlobResolver 临时产生，不持久化）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    /// 绝对远程路径
    pub path: String,
    /// 文件大小（尽力而为，可能未知）
    pub size: Option<u64>,
    /// 修改时间（尽力而为）
    pub modified: Option<SystemTime>,
    /// 是否为目录（解析阶段用于排除，传输不会收到目录条目）
    pub is_dir: bool,
}

impl RemoteFileEntry {
    /// 路径最后一段（落地到本地目录时的文件名）
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// 单个文件的失败原因
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TransferFailure {
    /// 远程读取失败
    #[error("remote read failed: {0}")]
    RemoteRead(String),
    /// 本地写入失败
    #[error("local write failed: {0}")]
    LocalWrite(String),
    /// 传输层断开
    #[error("connection lost")]
    ConnectionLost,
}

/// 单个文件的结局
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOutcome {
    /// 复制成功
    Success,
    /// 未尝试（连接断开或用户取消后跳过）
    Skipped,
    /// 复制失败
    Failed(TransferFailure),
}

/// 单个文件的传输结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    /// 远程路径
    pub remote_path: String,
    /// 本地路径
    pub local_path: PathBuf,
    /// 已复制字节数
    pub bytes_copied: u64,
    /// 结局
    pub outcome: FileOutcome,
}

/// 整批传输的终止方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferTermination {
    /// 每个条目都已尝试
    Completed,
    /// 连接断开导致提前终止
    ConnectionLost,
    /// 用户取消导致提前终止
    Cancelled,
}

/// 整批传输报告
///
/// 每次传输调用产生一个，创建后不可变，由调用方持有。
/// 部分失败是常态：UI 依赖它显示"7 of 10 files copied, 2 failed, 1 skipped"
/// 这类汇总，而不是全有或全无的结果。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReport {
    /// 按解析顺序排列的单文件结果
    pub files: Vec<FileReport>,
    /// 终止方式
    pub termination: TransferTermination,
}

impl TransferReport {
    /// 成功数
    pub fn succeeded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Success)
            .count()
    }

    /// 失败数
    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed(_)))
            .count()
    }

    /// 跳过数
    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Skipped)
            .count()
    }

    /// 累计复制字节数
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes_copied).sum()
    }

    /// 是否全部成功且未提前终止
    pub fn is_complete_success(&self) -> bool {
        self.termination == TransferTermination::Completed && self.succeeded() == self.files.len()
    }

    /// 汇总文本
    pub fn summary(&self) -> String {
        format!(
            "{} of {} files copied, {} failed, {} skipped",
            self.succeeded(),
            self.files.len(),
            self.failed(),
            self.skipped()
        )
    }
}
