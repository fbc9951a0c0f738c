// SSH 客户端核心实现
// 负责拨号、握手与认证，产出 DutSession

use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::Handle;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::config::{AuthMethod, SessionConfig};
use super::error::SshError;
use super::handler::SshClientHandler;
use super::session::DutSession;

/// SSH 客户端
/// 负责建立 SSH 连接并返回 DutSession
pub struct SshClient {
    /// 连接配置
    config: SessionConfig,
}

impl SshClient {
    /// 创建新的 SSH 客户端
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// 执行连接（异步）
    /// 返回 DutSession 用于后续操作
    pub async fn connect(&self, session_id: String) -> Result<DutSession, SshError> {
        info!(
            "[SSH] Connecting to {}@{}:{}",
            self.config.username, self.config.host, self.config.port
        );

        // 解析地址
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| SshError::Dns(format!("{}: {}", self.config.host, e)))?
            .next()
            .ok_or_else(|| SshError::Dns(format!("{}: no address found", self.config.host)))?;

        // TCP 连接
        let connect_timeout = Duration::from_secs(self.config.connect_timeout);
        let tcp_stream = timeout(connect_timeout, TcpStream::connect(socket_addr))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::ConnectionRefused {
                    SshError::Refused(socket_addr.to_string())
                } else {
                    SshError::Io(e)
                }
            })?;

        debug!("[SSH] TCP connection established to {}", socket_addr);

        // SSH 握手
        let russh_config = Arc::new(self.config.to_russh_config());
        let handler = SshClientHandler::new(self.config.host.clone());

        let mut handle = timeout(
            connect_timeout,
            russh::client::connect_stream(russh_config, tcp_stream, handler),
        )
        .await
        .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
        .map_err(SshError::from)?;

        debug!("[SSH] Handshake completed");

        // 认证
        self.authenticate(&mut handle).await?;

        info!(
            "[SSH] Authenticated as '{}', session established",
            self.config.username
        );

        Ok(DutSession::new(
            session_id,
            Arc::new(handle),
            self.config.host.clone(),
            self.config.username.clone(),
        ))
    }

    /// 执行认证
    async fn authenticate(&self, handle: &mut Handle<SshClientHandler>) -> Result<(), SshError> {
        use russh::client::AuthResult;

        let auth_result = match &self.config.auth {
            AuthMethod::None => {
                debug!("[SSH] Using none authentication");
                handle
                    .authenticate_none(&self.config.username)
                    .await
                    .map_err(SshError::from)?
            }
            AuthMethod::Password(password) => {
                debug!("[SSH] Using password authentication");
                handle
                    .authenticate_password(&self.config.username, password)
                    .await
                    .map_err(SshError::from)?
            }
            AuthMethod::PublicKey {
                key_path,
                passphrase,
            } => {
                debug!("[SSH] Using public key authentication: {:?}", key_path);
                let key = self
                    .load_private_key(key_path, passphrase.as_deref())
                    .await?;
                let key_with_alg = russh::keys::PrivateKeyWithHashAlg::new(
                    Arc::new(key),
                    None, // 默认哈希算法
                );
                handle
                    .authenticate_publickey(&self.config.username, key_with_alg)
                    .await
                    .map_err(SshError::from)?
            }
        };

        match auth_result {
            AuthResult::Success => Ok(()),
            AuthResult::Failure {
                remaining_methods,
                partial_success,
            } => {
                if partial_success {
                    return Err(SshError::Auth(
                        "Partial authentication - additional auth required".to_string(),
                    ));
                }
                Err(SshError::Auth(format!(
                    "Authentication failed. Server suggests: {:?}",
                    remaining_methods
                )))
            }
        }
    }

    /// 加载私钥文件
    async fn load_private_key(
        &self,
        key_path: &Path,
        passphrase: Option<&str>,
    ) -> Result<russh::keys::PrivateKey, SshError> {
        let key_data = tokio::fs::read(key_path)
            .await
            .map_err(|e| SshError::Key(format!("Failed to read key file: {}", e)))?;

        let key = russh::keys::decode_secret_key(&String::from_utf8_lossy(&key_data), passphrase)
            .map_err(|e| SshError::Key(format!("Failed to decode key: {}", e)))?;

        debug!("[SSH] Private key loaded from {:?}", key_path);
        Ok(key)
    }
}
