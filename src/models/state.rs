// 连接状态机
// 会话生命周期的四个状态，状态迁移只能由 SessionManager 驱动

use serde::{Deserialize, Serialize};

/// 连接状态（互斥）
///
/// 允许的迁移边：
/// - `Disconnected -> Connecting`
/// - `Connecting -> Connected | Failed`
/// - `Connected -> Failed`（操作期间连接断开）
/// - `Connected | Failed -> Disconnected`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// 未连接
    Disconnected,
    /// 连接中（TCP / 握手 / 认证）
    Connecting,
    /// 已连接
    Connected,
    /// 连接失败（带人类可读原因）
    Failed(String),
}

impl ConnectionState {
    /// 是否允许迁移到 `next`
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Failed(_))
                | (Connected, Failed(_))
                | (Connected, Disconnected)
                | (Failed(_), Disconnected)
        )
    }

    /// 是否已连接
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// 状态的显示名称
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Failed(_) => "Failed",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Failed(reason) => write!(f, "Failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}
