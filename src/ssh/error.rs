// SSH 错误类型定义

use thiserror::Error;

/// 传输层错误
///
/// 连接阶段的失败原因（DNS / 拒绝 / 认证 / 超时）各自独立成员，
/// 保证 `Failed(reason)` 里的文案能区分它们。
#[derive(Debug, Error)]
pub enum SshError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS 解析失败
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// 对端拒绝连接
    #[error("Connection refused: {0}")]
    Refused(String),

    /// IO 错误（网络连接等）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 认证失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SSH 协议错误
    #[error("SSH protocol error: {0}")]
    Protocol(String),

    /// 密钥错误
    #[error("Key error: {0}")]
    Key(String),

    /// 连接超时
    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    /// 通道错误
    #[error("Channel error: {0}")]
    Channel(String),

    /// 会话已断开
    #[error("Session disconnected: {0}")]
    Disconnected(String),
}

impl SshError {
    /// 是否意味着底层传输已不可用
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            SshError::Io(_)
                | SshError::Protocol(_)
                | SshError::Channel(_)
                | SshError::Disconnected(_)
        )
    }
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        SshError::Protocol(e.to_string())
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(e: russh::keys::Error) -> Self {
        SshError::Key(e.to_string())
    }
}

/// 会话级错误（经由 SessionManager 的操作门返回）
#[derive(Debug, Error)]
pub enum SessionError {
    /// 另一个远程操作正在进行（仅 BusyPolicy::Reject 下出现）
    #[error("another operation is in flight")]
    Busy,

    /// 会话未连接
    #[error("session is not connected")]
    NotConnected,

    /// 操作期间连接断开
    #[error("connection lost")]
    ConnectionLost,

    /// 命令在下发前被拒绝
    #[error(transparent)]
    Command(#[from] crate::services::exec::CommandError),

    /// 整批传输失败（解析或目标目录）
    #[error(transparent)]
    Transfer(#[from] crate::services::transfer::TransferError),

    /// 传输层错误
    #[error(transparent)]
    Ssh(#[from] SshError),
}

impl SessionError {
    /// 是否应把会话标记为断开
    pub fn is_connection_lost(&self) -> bool {
        match self {
            SessionError::ConnectionLost => true,
            SessionError::Ssh(e) => e.is_connection_lost(),
            _ => false,
        }
    }
}
