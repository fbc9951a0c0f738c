// SSH 会话
// 连接成功后的会话对象，按操作开辟通道

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use russh::client::{Handle, Msg};
use russh::ChannelMsg;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::SshError;
use super::handler::SshClientHandler;
use crate::models::command::RawCommandOutput;

// 使用 russh::client::Msg 作为消息类型
type RusshChannel = russh::Channel<Msg>;

/// DUT 会话（连接成功后）
///
/// 唯一的传输句柄持有者。其他组件只在一次受门保护的操作期间
/// 借用它开辟通道，不得跨调用保留引用。
pub struct DutSession {
    /// 会话 ID
    id: String,
    /// 共享的 russh Handle（Arc 包装）
    handle: Arc<Handle<SshClientHandler>>,
    /// DUT 主机名
    host: String,
    /// 用户名
    username: String,
    /// 连接状态
    is_connected: AtomicBool,
}

impl DutSession {
    /// 创建新的会话
    pub fn new(
        id: String,
        handle: Arc<Handle<SshClientHandler>>,
        host: String,
        username: String,
    ) -> Self {
        Self {
            id,
            handle,
            host,
            username,
            is_connected: AtomicBool::new(true),
        }
    }

    /// 获取会话 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 获取主机名
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 获取用户名
    pub fn username(&self) -> &str {
        &self.username
    }

    /// 检查会话是否活跃
    pub fn is_alive(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed)
    }

    /// 标记会话断开
    pub fn mark_disconnected(&self) {
        self.is_connected.store(false, Ordering::Relaxed);
    }

    /// 打开执行通道（单条命令一次性使用）
    pub async fn open_exec(&self) -> Result<ExecChannel, SshError> {
        if !self.is_alive() {
            return Err(SshError::Disconnected(
                "Session is disconnected".to_string(),
            ));
        }

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(SshError::from)?;

        Ok(ExecChannel::new(channel))
    }

    /// 打开 SFTP 子系统通道
    pub async fn open_sftp(&self) -> Result<RusshChannel, SshError> {
        if !self.is_alive() {
            return Err(SshError::Disconnected(
                "Session is disconnected".to_string(),
            ));
        }

        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(SshError::from)?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(SshError::from)?;

        Ok(channel)
    }

    /// 关闭会话
    pub async fn close(&self) -> Result<(), SshError> {
        self.mark_disconnected();
        debug!("[SSH] Session {} marked disconnected", self.id);
        // Handle 会在 drop 时关闭底层连接
        Ok(())
    }
}

/// 执行通道（单条命令）
pub struct ExecChannel {
    channel: Mutex<RusshChannel>,
}

impl ExecChannel {
    fn new(channel: RusshChannel) -> Self {
        Self {
            channel: Mutex::new(channel),
        }
    }

    /// 执行命令并收集输出
    /// stdout 与 stderr 分开累积（扩展数据流 1 = stderr），绝不混写
    pub async fn exec(&self, command: &str) -> Result<RawCommandOutput, SshError> {
        let mut channel = self.channel.lock().await;

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::Channel(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        loop {
            match channel.wait().await {
                Some(channel_msg) => match channel_msg {
                    ChannelMsg::Data { data } => {
                        stdout.extend_from_slice(&data);
                    }
                    ChannelMsg::ExtendedData { data, ext } => {
                        if ext == 1 {
                            // stderr
                            stderr.extend_from_slice(&data);
                        }
                    }
                    ChannelMsg::ExitStatus { exit_status } => {
                        exit_code = Some(exit_status);
                    }
                    ChannelMsg::Eof | ChannelMsg::Close => {
                        break;
                    }
                    _ => {}
                },
                None => break,
            }
        }

        Ok(RawCommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// 请求关闭远端通道（超时后的取消路径）
    pub async fn request_close(&self) {
        let channel = self.channel.lock().await;
        if let Err(e) = channel.eof().await {
            debug!("[SSH] Channel close request failed: {}", e);
        }
    }
}
