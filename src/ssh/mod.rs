// SSH 连接模块
//
// 模块结构:
// - config: 连接配置 (SessionConfig, AuthMethod)
// - error: 错误类型 (SshError, SessionError)
// - event: 状态发布 (StatusPublisher)
// - handler: russh Handler 实现
// - client: SSH 客户端核心
// - session: SSH 会话 (DutSession, ExecChannel)
// - manager: 会话管理器 (SessionManager, 操作门)

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod manager;
pub mod session;

// 公开导出
pub use client::SshClient;
pub use config::{AuthMethod, BusyPolicy, KeepaliveConfig, SessionConfig};
pub use error::{SessionError, SshError};
pub use event::StatusPublisher;
pub use manager::SessionManager;
pub use session::{DutSession, ExecChannel};
