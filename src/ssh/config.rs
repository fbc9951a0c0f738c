// SSH 连接配置

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 会话配置
///
/// 一次 connect 尝试开始后即不可变；新的 connect 可以携带新配置，
/// 旧传输拆除后才会原子替换。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 目标主机（DUT 地址）
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 单条命令超时（秒）
    pub command_timeout: u64,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
    /// 操作门的并发策略
    pub busy_policy: BusyPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: "root".to_string(),
            auth: AuthMethod::None,
            connect_timeout: 15,
            command_timeout: 30,
            keepalive: KeepaliveConfig::default(),
            busy_policy: BusyPolicy::default(),
        }
    }
}

/// 认证方式
///
/// 嵌入式 DUT 多为免密 root 登录，因此 `None`（none-auth）是合法选项。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuthMethod {
    /// 无认证（none-auth，典型的免密嵌入式目标）
    None,
    /// 密码认证
    Password(String),
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥口令（如果有）
        passphrase: Option<String>,
    },
}

/// 心跳配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// 是否启用心跳
    pub enabled: bool,
    /// 心跳间隔（秒）
    pub interval: u64,
    /// 最大重试次数
    pub max_retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 30,
            max_retries: 3,
        }
    }
}

/// 第二个并发请求的处理策略
///
/// 默认排队，保持用户可见的操作顺序。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusyPolicy {
    /// 排队等待当前操作完成
    #[default]
    Queue,
    /// 立即拒绝并返回 Busy
    Reject,
}

/// russh 客户端配置构建
impl SessionConfig {
    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // russh 没有单独的 connection_timeout，用 inactivity_timeout 兜底
        config.inactivity_timeout = Some(std::time::Duration::from_secs(self.connect_timeout));
        if self.keepalive.enabled {
            config.keepalive_interval =
                Some(std::time::Duration::from_secs(self.keepalive.interval));
            config.keepalive_max = self.keepalive.max_retries as usize;
        }
        config
    }

    /// 命令超时
    pub fn command_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.command_timeout)
    }
}
