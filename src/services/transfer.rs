// 文件传输引擎
// 按解析顺序逐个把远程文件复制到本地目录，记录单文件结局。
//
// 部分失败是核心契约：单个文件失败后继续下一个，只有连接断开或
// 用户取消才提前终止（剩余条目标记 skipped）。

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::glob::{GlobError, RemoteGlobResolver};
use super::remote_fs::RemoteFs;
use crate::models::transfer::{
    FileOutcome, FileReport, RemoteFileEntry, TransferFailure, TransferReport,
    TransferTermination,
};

/// 整批传输才会抛的错误；单文件失败记录在报告里
#[derive(Debug, Error)]
pub enum TransferError {
    /// 模式解析 / 远程列目录失败
    #[error(transparent)]
    Glob(#[from] GlobError),

    /// 目标目录无法创建（文件系统权限问题对整批是致命的）
    #[error("failed to create destination directory {path:?}: {source}")]
    DestDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// 单个文件复制的结束方式
enum CopyEnd {
    Done,
    Cancelled,
    Failed(TransferFailure),
}

/// 文件传输引擎
pub struct FileTransferEngine {
    /// 复制分块大小
    chunk_size: usize,
}

impl Default for FileTransferEngine {
    fn default() -> Self {
        Self {
            chunk_size: 32 * 1024,
        }
    }
}

impl FileTransferEngine {
    /// 指定分块大小创建引擎
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// 传输匹配 pattern 的远程文件到 dest_dir
    pub async fn transfer(
        &self,
        remote: &dyn RemoteFs,
        pattern: &str,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        self.transfer_with_progress(remote, pattern, dest_dir, cancel, |_, _, _| {})
            .await
    }

    /// 传输（带每块进度回调：远程路径、已复制字节、总大小）
    pub async fn transfer_with_progress<F>(
        &self,
        remote: &dyn RemoteFs,
        pattern: &str,
        dest_dir: &Path,
        cancel: &CancellationToken,
        mut progress: F,
    ) -> Result<TransferReport, TransferError>
    where
        F: FnMut(&str, u64, Option<u64>),
    {
        let entries = RemoteGlobResolver::resolve(remote, pattern).await?;
        info!(
            "[Transfer] {} -> {:?}: {} files matched",
            pattern,
            dest_dir,
            entries.len()
        );

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|source| TransferError::DestDir {
                path: dest_dir.to_path_buf(),
                source,
            })?;

        let mut files = Vec::with_capacity(entries.len());
        let mut termination = TransferTermination::Completed;

        for entry in entries {
            let local_path = dest_dir.join(entry.file_name());

            // 提前终止后剩余条目不再尝试远程读取
            if termination != TransferTermination::Completed {
                files.push(FileReport {
                    remote_path: entry.path,
                    local_path,
                    bytes_copied: 0,
                    outcome: FileOutcome::Skipped,
                });
                continue;
            }

            let (bytes_copied, end) = self
                .copy_file(remote, &entry, &local_path, cancel, &mut progress)
                .await;

            let outcome = match end {
                CopyEnd::Done => {
                    debug!(
                        "[Transfer] Copied {} -> {:?} ({} bytes)",
                        entry.path, local_path, bytes_copied
                    );
                    FileOutcome::Success
                }
                CopyEnd::Cancelled => {
                    info!("[Transfer] Cancelled while copying {}", entry.path);
                    // 进行中的半成品不保留
                    let _ = tokio::fs::remove_file(&local_path).await;
                    termination = TransferTermination::Cancelled;
                    FileOutcome::Skipped
                }
                CopyEnd::Failed(failure) => {
                    warn!("[Transfer] {} failed: {}", entry.path, failure);
                    if failure == TransferFailure::ConnectionLost {
                        termination = TransferTermination::ConnectionLost;
                    }
                    FileOutcome::Failed(failure)
                }
            };

            files.push(FileReport {
                remote_path: entry.path,
                local_path,
                bytes_copied,
                outcome,
            });
        }

        let report = TransferReport { files, termination };
        info!("[Transfer] {}", report.summary());
        Ok(report)
    }

    /// 复制单个文件，返回（已复制字节数, 结束方式）
    async fn copy_file<F>(
        &self,
        remote: &dyn RemoteFs,
        entry: &RemoteFileEntry,
        local_path: &Path,
        cancel: &CancellationToken,
        progress: &mut F,
    ) -> (u64, CopyEnd)
    where
        F: FnMut(&str, u64, Option<u64>),
    {
        let mut reader = match remote.open_read(&entry.path).await {
            Ok(reader) => reader,
            Err(e) => {
                let failure = if e.is_connection_lost() {
                    TransferFailure::ConnectionLost
                } else {
                    TransferFailure::RemoteRead(e.to_string())
                };
                return (0, CopyEnd::Failed(failure));
            }
        };

        let mut file = match tokio::fs::File::create(local_path).await {
            Ok(file) => file,
            Err(e) => {
                return (0, CopyEnd::Failed(TransferFailure::LocalWrite(e.to_string())));
            }
        };

        let mut buf = vec![0u8; self.chunk_size];
        let mut copied = 0u64;

        loop {
            // 协作式取消检查点：每个分块边界
            if cancel.is_cancelled() {
                return (copied, CopyEnd::Cancelled);
            }

            let read = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) => {
                    return (copied, CopyEnd::Failed(classify_read_error(&e)));
                }
            };

            if let Err(e) = file.write_all(&buf[..read]).await {
                return (copied, CopyEnd::Failed(TransferFailure::LocalWrite(e.to_string())));
            }

            copied += read as u64;
            progress(&entry.path, copied, entry.size);
        }

        if let Err(e) = file.flush().await {
            return (copied, CopyEnd::Failed(TransferFailure::LocalWrite(e.to_string())));
        }

        (copied, CopyEnd::Done)
    }
}

/// 远程读取错误分类：管道级错误视为连接断开
fn classify_read_error(e: &std::io::Error) -> TransferFailure {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionAborted
        | ErrorKind::ConnectionReset
        | ErrorKind::NotConnected => TransferFailure::ConnectionLost,
        _ => TransferFailure::RemoteRead(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::AsyncRead;

    use crate::ssh::error::SshError;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::WARN.into()),
            )
            .with_target(false)
            .try_init();
    }

    /// 可注入失败的远程文件内容
    #[derive(Clone)]
    enum MockFile {
        Content(Vec<u8>),
        /// 读取 `ok_bytes` 个字节后报错
        FailAfter {
            ok_bytes: Vec<u8>,
            kind: io::ErrorKind,
        },
        /// open 阶段即断线
        OpenLost,
    }

    /// 测试用远程文件系统
    struct MockRemote {
        dir: String,
        files: Vec<(String, MockFile)>,
    }

    impl MockRemote {
        fn new(dir: &str, files: Vec<(&str, MockFile)>) -> Self {
            Self {
                dir: dir.to_string(),
                files: files
                    .into_iter()
                    .map(|(name, file)| (name.to_string(), file))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl RemoteFs for MockRemote {
        async fn read_dir(&self, dir: &str) -> Result<Vec<RemoteFileEntry>, SshError> {
            assert_eq!(dir, self.dir);
            Ok(self
                .files
                .iter()
                .map(|(name, file)| RemoteFileEntry {
                    path: format!("{}/{}", dir.trim_end_matches('/'), name),
                    size: match file {
                        MockFile::Content(data) => Some(data.len() as u64),
                        _ => None,
                    },
                    modified: None,
                    is_dir: false,
                })
                .collect())
        }

        async fn open_read(
            &self,
            path: &str,
        ) -> Result<Box<dyn AsyncRead + Send + Unpin>, SshError> {
            let name = path.rsplit('/').next().unwrap();
            let file = self
                .files
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, f)| f.clone())
                .expect("unknown remote file");
            match file {
                MockFile::Content(data) => Ok(Box::new(MockReader {
                    data,
                    pos: 0,
                    fail: None,
                })),
                MockFile::FailAfter { ok_bytes, kind } => Ok(Box::new(MockReader {
                    data: ok_bytes,
                    pos: 0,
                    fail: Some(kind),
                })),
                MockFile::OpenLost => Err(SshError::Disconnected("pipe broken".into())),
            }
        }
    }

    struct MockReader {
        data: Vec<u8>,
        pos: usize,
        fail: Option<io::ErrorKind>,
    }

    impl AsyncRead for MockReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.pos >= self.data.len() {
                return match self.fail.take() {
                    Some(kind) => Poll::Ready(Err(io::Error::new(kind, "injected"))),
                    None => Poll::Ready(Ok(())),
                };
            }
            let n = std::cmp::min(buf.remaining(), self.data.len() - self.pos);
            let pos = self.pos;
            buf.put_slice(&self.data[pos..pos + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    fn outcomes(report: &TransferReport) -> Vec<&FileOutcome> {
        report.files.iter().map(|f| &f.outcome).collect()
    }

    #[tokio::test]
    async fn test_all_files_copied() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![
                ("a.jpg", MockFile::Content(b"aaaa".to_vec())),
                ("b.jpg", MockFile::Content(b"bb".to_vec())),
            ],
        );
        let dest = tempfile::tempdir().unwrap();
        let engine = FileTransferEngine::default();
        let report = engine
            .transfer(
                &remote,
                "/mnt/usr/*.jpg",
                dest.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(report.is_complete_success());
        assert_eq!(report.total_bytes(), 6);
        assert_eq!(
            std::fs::read(dest.path().join("a.jpg")).unwrap(),
            b"aaaa".to_vec()
        );
        assert_eq!(
            std::fs::read(dest.path().join("b.jpg")).unwrap(),
            b"bb".to_vec()
        );
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_batch() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![
                ("a.bin", MockFile::Content(b"a".to_vec())),
                // 第二个文件本地写入会失败：目标位置被同名目录占用
                ("b.bin", MockFile::Content(b"b".to_vec())),
                ("c.bin", MockFile::Content(b"c".to_vec())),
            ],
        );
        let dest = tempfile::tempdir().unwrap();
        std::fs::create_dir(dest.path().join("b.bin")).unwrap();

        let engine = FileTransferEngine::default();
        let report = engine
            .transfer(
                &remote,
                "/mnt/usr/*.bin",
                dest.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let got = outcomes(&report);
        assert_eq!(got[0], &FileOutcome::Success);
        assert!(matches!(
            got[1],
            FileOutcome::Failed(TransferFailure::LocalWrite(_))
        ));
        assert_eq!(got[2], &FileOutcome::Success);
        assert_eq!(report.termination, TransferTermination::Completed);
        assert_eq!(report.summary(), "2 of 3 files copied, 1 failed, 0 skipped");
    }

    #[tokio::test]
    async fn test_connection_loss_skips_remaining() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![
                ("a.yuv", MockFile::OpenLost),
                ("b.yuv", MockFile::Content(b"b".to_vec())),
                ("c.yuv", MockFile::Content(b"c".to_vec())),
            ],
        );
        let dest = tempfile::tempdir().unwrap();
        let engine = FileTransferEngine::default();
        let report = engine
            .transfer(
                &remote,
                "/mnt/usr/*.yuv",
                dest.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            outcomes(&report),
            vec![
                &FileOutcome::Failed(TransferFailure::ConnectionLost),
                &FileOutcome::Skipped,
                &FileOutcome::Skipped,
            ]
        );
        assert_eq!(report.termination, TransferTermination::ConnectionLost);
    }

    #[tokio::test]
    async fn test_mid_read_pipe_error_is_connection_loss() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![
                (
                    "a.log",
                    MockFile::FailAfter {
                        ok_bytes: b"partial".to_vec(),
                        kind: io::ErrorKind::BrokenPipe,
                    },
                ),
                ("b.log", MockFile::Content(b"b".to_vec())),
            ],
        );
        let dest = tempfile::tempdir().unwrap();
        let engine = FileTransferEngine::with_chunk_size(4);
        let report = engine
            .transfer(
                &remote,
                "/mnt/usr/*.log",
                dest.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(matches!(
            report.files[0].outcome,
            FileOutcome::Failed(TransferFailure::ConnectionLost)
        ));
        assert_eq!(report.files[1].outcome, FileOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_mid_read_other_error_continues_batch() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![
                (
                    "a.log",
                    MockFile::FailAfter {
                        ok_bytes: Vec::new(),
                        kind: io::ErrorKind::InvalidData,
                    },
                ),
                ("b.log", MockFile::Content(b"ok".to_vec())),
            ],
        );
        let dest = tempfile::tempdir().unwrap();
        let engine = FileTransferEngine::default();
        let report = engine
            .transfer(
                &remote,
                "/mnt/usr/*.log",
                dest.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(matches!(
            report.files[0].outcome,
            FileOutcome::Failed(TransferFailure::RemoteRead(_))
        ));
        assert_eq!(report.files[1].outcome, FileOutcome::Success);
        assert_eq!(report.termination, TransferTermination::Completed);
    }

    #[tokio::test]
    async fn test_cancellation_skips_and_preserves_completed() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![
                ("a.bin", MockFile::Content(b"done".to_vec())),
                ("b.bin", MockFile::Content(vec![0u8; 64])),
                ("c.bin", MockFile::Content(b"never".to_vec())),
            ],
        );
        let dest = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();

        // 第一个文件完成后取消
        let engine = FileTransferEngine::with_chunk_size(16);
        let cancel_clone = cancel.clone();
        let mut seen_first = false;
        let report = engine
            .transfer_with_progress(
                &remote,
                "/mnt/usr/*.bin",
                dest.path(),
                &cancel,
                move |path, _copied, _total| {
                    if path.ends_with("a.bin") {
                        seen_first = true;
                    } else if seen_first {
                        cancel_clone.cancel();
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(report.files[0].outcome, FileOutcome::Success);
        assert_eq!(report.files[1].outcome, FileOutcome::Skipped);
        assert_eq!(report.files[2].outcome, FileOutcome::Skipped);
        assert_eq!(report.termination, TransferTermination::Cancelled);
        // 已完成的结果保留，半成品被清理
        assert!(dest.path().join("a.bin").exists());
        assert!(!dest.path().join("b.bin").exists());
    }

    #[tokio::test]
    async fn test_empty_match_yields_empty_report() {
        init_tracing();
        let remote = MockRemote::new("/mnt/usr", vec![]);
        let dest = tempfile::tempdir().unwrap();
        let engine = FileTransferEngine::default();
        let report = engine
            .transfer(
                &remote,
                "/mnt/usr/*.jpg",
                dest.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(report.files.is_empty());
        assert_eq!(report.termination, TransferTermination::Completed);
        assert_eq!(report.summary(), "0 of 0 files copied, 0 failed, 0 skipped");
    }

    #[tokio::test]
    async fn test_destination_created_if_missing() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![("a.yml", MockFile::Content(b"k: v".to_vec()))],
        );
        let base = tempfile::tempdir().unwrap();
        let dest = base.path().join("out").join("nested");

        let engine = FileTransferEngine::default();
        let report = engine
            .transfer(&remote, "/mnt/usr/*.yml", &dest, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_complete_success());
        assert!(dest.join("a.yml").exists());
    }

    #[tokio::test]
    async fn test_destination_creation_failure_is_fatal() {
        init_tracing();
        let remote = MockRemote::new(
            "/mnt/usr",
            vec![("a.yml", MockFile::Content(b"k: v".to_vec()))],
        );
        let base = tempfile::tempdir().unwrap();
        // 路径中段被文件占住，create_dir_all 必然失败
        let blocker = base.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let dest = blocker.join("out");

        let engine = FileTransferEngine::default();
        let result = engine
            .transfer(&remote, "/mnt/usr/*.yml", &dest, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(TransferError::DestDir { .. })));
    }
}
