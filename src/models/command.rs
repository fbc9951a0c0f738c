// 命令执行结果类型

use std::time::Duration;

use chrono::{DateTime, Local};

/// 通道返回的原始输出（尚未套用超时语义）
#[derive(Clone, Debug, Default)]
pub struct RawCommandOutput {
    /// 标准输出
    pub stdout: Vec<u8>,
    /// 标准错误
    pub stderr: Vec<u8>,
    /// 退出码（通道在 ExitStatus 之前关闭时为 None）
    pub exit_code: Option<u32>,
}

/// 命令的最终结局
///
/// 超时与非零退出码是两种不同的结局：诊断类命令经常刻意返回非零，
/// 因此非零退出只作为结果上报，绝不作为错误抛出。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 远程进程退出（携带退出码）
    Exited(u32),
    /// 超过命令超时，通道已被要求关闭
    TimedOut,
    /// 执行期间传输层断开
    ConnectionLost,
}

impl CommandOutcome {
    /// 退出码（仅 Exited 有）
    pub fn code(&self) -> Option<u32> {
        match self {
            CommandOutcome::Exited(code) => Some(*code),
            _ => None,
        }
    }

    /// 是否以退出码 0 正常结束
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Exited(0))
    }
}

impl std::fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOutcome::Exited(code) => write!(f, "exit code {}", code),
            CommandOutcome::TimedOut => f.write_str("timed out"),
            CommandOutcome::ConnectionLost => f.write_str("connection lost"),
        }
    }
}

/// 一次命令执行的完整结果
///
/// 每次执行产生一个，创建后不可变，由调用方持有。
#[derive(Clone, Debug)]
pub struct CommandResult {
    /// 下发的命令文本（原样）
    pub command: String,
    /// 标准输出
    pub stdout: Vec<u8>,
    /// 标准错误
    pub stderr: Vec<u8>,
    /// 结局
    pub outcome: CommandOutcome,
    /// 执行耗时（墙钟）
    pub duration: Duration,
    /// 开始执行的时间
    pub executed_at: DateTime<Local>,
}

impl CommandResult {
    /// 标准输出文本（lossy UTF-8）
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// 标准错误文本（lossy UTF-8）
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// 命令是否成功（退出码 0）
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        assert!(CommandOutcome::Exited(0).is_success());
        assert!(!CommandOutcome::Exited(2).is_success());
        assert!(!CommandOutcome::TimedOut.is_success());
        assert!(!CommandOutcome::ConnectionLost.is_success());
    }

    #[test]
    fn test_outcome_code_only_for_exited() {
        assert_eq!(CommandOutcome::Exited(7).code(), Some(7));
        assert_eq!(CommandOutcome::TimedOut.code(), None);
        assert_eq!(CommandOutcome::ConnectionLost.code(), None);
    }

    #[test]
    fn test_lossy_text_accessors() {
        let result = CommandResult {
            command: "uname -a".to_string(),
            stdout: b"Linux dut 5.10\n".to_vec(),
            stderr: b"warning\n".to_vec(),
            outcome: CommandOutcome::Exited(0),
            duration: Duration::from_millis(12),
            executed_at: Local::now(),
        };
        assert_eq!(result.stdout_string(), "Linux dut 5.10\n");
        assert_eq!(result.stderr_string(), "warning\n");
        assert!(result.is_success());
    }
}
