// 命令执行器
// 在活跃会话上执行单条 shell 命令，套用超时并收集输出

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::command::{CommandOutcome, CommandResult, RawCommandOutput};
use crate::ssh::error::SshError;
use crate::ssh::session::ExecChannel;

/// 命令在下发前被拒绝的原因
///
/// 超时与非零退出不在这里：它们是结果（CommandOutcome），不是错误。
#[derive(Debug, Error)]
pub enum CommandError {
    /// 空命令（触网之前就拒绝）
    #[error("command text is empty")]
    Empty,
}

/// 命令通道抽象
/// ExecChannel 是生产实现；测试用 mock 注入超时与断线
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// 执行命令并收集完整输出
    async fn run(&self, command: &str) -> Result<RawCommandOutput, SshError>;

    /// 请求取消远端执行（尽力而为）
    async fn cancel(&self);
}

#[async_trait]
impl CommandChannel for ExecChannel {
    async fn run(&self, command: &str) -> Result<RawCommandOutput, SshError> {
        self.exec(command).await
    }

    async fn cancel(&self) {
        self.request_close().await;
    }
}

/// 命令执行器
///
/// 命令文本原样透传，不做任何隐式 shell 包装或转义；
/// 远程 shell 语法由编写命令的操作员负责。
pub struct CommandExecutor {
    /// 单条命令超时
    timeout: Duration,
}

impl CommandExecutor {
    /// 创建执行器
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 执行一条命令
    ///
    /// - 空命令：触网前返回 `CommandError::Empty`
    /// - 正常退出：`Exited(code)`（非零退出是上报，不是错误）
    /// - 超时：要求远端通道关闭，结果标记 `TimedOut`
    /// - 执行期间断线：结果标记 `ConnectionLost`
    pub async fn execute(
        &self,
        channel: &dyn CommandChannel,
        command: &str,
    ) -> Result<CommandResult, CommandError> {
        if command.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        let executed_at = Local::now();
        let started = Instant::now();

        debug!("[Exec] Running: {}", command);

        let (stdout, stderr, outcome) =
            match tokio::time::timeout(self.timeout, channel.run(command)).await {
                Ok(Ok(raw)) => {
                    // 通道在 ExitStatus 之前正常关闭时按 0 处理
                    let code = raw.exit_code.unwrap_or(0);
                    (raw.stdout, raw.stderr, CommandOutcome::Exited(code))
                }
                Ok(Err(e)) => {
                    warn!("[Exec] Transport error while running command: {}", e);
                    (Vec::new(), Vec::new(), CommandOutcome::ConnectionLost)
                }
                Err(_) => {
                    warn!(
                        "[Exec] Command exceeded timeout of {:?}, closing channel",
                        self.timeout
                    );
                    channel.cancel().await;
                    (Vec::new(), Vec::new(), CommandOutcome::TimedOut)
                }
            };

        let duration = started.elapsed();
        debug!("[Exec] Finished ({}) in {:?}", outcome, duration);

        Ok(CommandResult {
            command: command.to_string(),
            stdout,
            stderr,
            outcome,
            duration,
            executed_at,
        })
    }
}
