// 远程文件系统接口 - 封装 russh-sftp 客户端
// Glob 解析与文件传输都通过这个接口访问远端，测试用 mock 实现

use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::models::transfer::RemoteFileEntry;
use crate::ssh::error::SshError;
use crate::ssh::session::DutSession;

/// 远程文件系统抽象
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// 列出目录内容（不含 "." 与 ".."）
    async fn read_dir(&self, dir: &str) -> Result<Vec<RemoteFileEntry>, SshError>;

    /// 打开远程文件用于读取
    async fn open_read(
        &self,
        path: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, SshError>;
}

/// SFTP 实现
/// 每次受门保护的操作各自打开一条 SFTP 子系统通道
pub struct SftpRemote {
    sftp: SftpSession,
}

impl SftpRemote {
    /// 在会话上打开 SFTP 子系统
    pub async fn open(session: &DutSession) -> Result<Self, SshError> {
        debug!("[SFTP] Opening sftp subsystem on session {}", session.id());

        let channel = session.open_sftp().await?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SshError::Channel(format!("Failed to create SFTP session: {}", e)))?;

        Ok(Self { sftp })
    }
}

#[async_trait]
impl RemoteFs for SftpRemote {
    async fn read_dir(&self, dir: &str) -> Result<Vec<RemoteFileEntry>, SshError> {
        debug!("[SFTP] Reading directory: {}", dir);

        let entries = self
            .sftp
            .read_dir(dir)
            .await
            .map_err(|e| SshError::Channel(format!("Failed to read directory {}: {}", dir, e)))?;

        let mut result = Vec::new();
        for entry in entries {
            let name = entry.file_name();

            // 跳过 . 和 ..
            if name == "." || name == ".." {
                continue;
            }

            let full_path = if dir == "/" {
                format!("/{}", name)
            } else {
                format!("{}/{}", dir.trim_end_matches('/'), name)
            };

            let attrs = entry.metadata();

            let modified = attrs.mtime.map(|mtime| {
                std::time::UNIX_EPOCH + std::time::Duration::from_secs(mtime as u64)
            });

            result.push(RemoteFileEntry {
                path: full_path,
                size: attrs.size,
                modified,
                is_dir: attrs.is_dir(),
            });
        }

        debug!("[SFTP] Read {} entries from {}", result.len(), dir);
        Ok(result)
    }

    async fn open_read(
        &self,
        path: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, SshError> {
        debug!("[SFTP] Opening file for read: {}", path);

        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| SshError::Channel(format!("Failed to open file {}: {}", path, e)))?;

        Ok(Box::new(file))
    }
}
