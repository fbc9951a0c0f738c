// 会话管理器
// 持有唯一的连接槽位，驱动状态机，并通过操作门串行化所有远程操作。
//
// 一条物理 SSH 会话不允许被两个逻辑操作并发使用（协议通道有状态），
// 正确性依赖远程交互的全序；UI 也必须始终能拿到唯一权威的状态。

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::SshClient;
use super::config::{BusyPolicy, SessionConfig};
use super::error::SessionError;
use super::event::StatusPublisher;
use super::session::DutSession;
use crate::models::command::{CommandOutcome, CommandResult};
use crate::models::state::ConnectionState;
use crate::models::transfer::{TransferReport, TransferTermination};
use crate::services::exec::{CommandError, CommandExecutor};
use crate::services::remote_fs::SftpRemote;
use crate::services::transfer::FileTransferEngine;

/// 操作门
/// 同一时刻最多一个在途远程操作（connect、命令或传输）
struct OpGate {
    slot: tokio::sync::Mutex<()>,
}

impl OpGate {
    fn new() -> Self {
        Self {
            slot: tokio::sync::Mutex::new(()),
        }
    }

    /// 按策略获取操作权：排队等待，或立即返回 Busy
    async fn acquire(
        &self,
        policy: BusyPolicy,
    ) -> Result<tokio::sync::MutexGuard<'_, ()>, SessionError> {
        match policy {
            BusyPolicy::Queue => Ok(self.slot.lock().await),
            BusyPolicy::Reject => self.slot.try_lock().map_err(|_| SessionError::Busy),
        }
    }
}

/// 会话管理器
///
/// 每个实例独占一个连接槽位；调用方持有并传递实例，没有进程级全局状态。
pub struct SessionManager {
    /// 当前状态（非阻塞快照）
    state: Mutex<ConnectionState>,
    /// 当前配置
    config: Mutex<SessionConfig>,
    /// 连接槽位
    session: Mutex<Option<Arc<DutSession>>>,
    /// 操作门
    gate: OpGate,
    /// 状态发布器
    publishers: Mutex<Vec<Arc<dyn StatusPublisher>>>,
}

impl SessionManager {
    /// 创建新的管理器（初始为 Disconnected）
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            config: Mutex::new(SessionConfig::default()),
            session: Mutex::new(None),
            gate: OpGate::new(),
            publishers: Mutex::new(Vec::new()),
        }
    }

    /// 当前状态快照
    pub fn state(&self) -> ConnectionState {
        self.state.lock().unwrap().clone()
    }

    /// 是否已连接（非阻塞快照）
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// 当前配置快照
    pub fn config(&self) -> SessionConfig {
        self.config.lock().unwrap().clone()
    }

    /// 注册状态发布器
    pub fn add_publisher(&self, publisher: Arc<dyn StatusPublisher>) {
        self.publishers.lock().unwrap().push(publisher);
    }

    /// 订阅状态迁移（每次迁移按序投递）
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectionState> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_publisher(Arc::new(move |state: &ConnectionState| {
            let _ = tx.send(state.clone());
        }));
        rx
    }

    /// 建立连接
    ///
    /// 已处于 Connecting 时直接返回当前状态（fail fast）；否则拆除旧传输、
    /// 迁移到 Connecting 并在连接超时内完成拨号 + 握手 + 认证。
    /// 任何失败（DNS、拒绝、认证、超时）都以 `Failed(reason)` 收场，不向外抛。
    pub async fn connect(&self, config: SessionConfig) -> ConnectionState {
        if self.state() == ConnectionState::Connecting {
            warn!("[Session] Connect requested while already connecting, ignored");
            return ConnectionState::Connecting;
        }

        // connect 同样经过操作门：不与在途命令/传输抢占传输层
        let _permit = match self.gate.acquire(BusyPolicy::Queue).await {
            Ok(permit) => permit,
            Err(_) => unreachable!("queue policy never rejects"),
        };

        // 拆除现有传输
        let old = self.session.lock().unwrap().take();
        if let Some(old) = old {
            let _ = old.close().await;
        }
        match self.state() {
            ConnectionState::Connected | ConnectionState::Failed(_) => {
                self.transition(ConnectionState::Disconnected);
            }
            _ => {}
        }

        self.transition(ConnectionState::Connecting);

        // 旧传输已拆除，原子替换配置
        *self.config.lock().unwrap() = config.clone();

        let session_id = uuid::Uuid::new_v4().to_string();
        let client = SshClient::new(config);

        match client.connect(session_id).await {
            Ok(session) => {
                *self.session.lock().unwrap() = Some(Arc::new(session));
                self.transition(ConnectionState::Connected);
            }
            Err(e) => {
                info!("[Session] Connect failed: {}", e);
                self.transition(ConnectionState::Failed(e.to_string()));
            }
        }

        self.state()
    }

    /// 断开连接（幂等）
    ///
    /// Connected / Failed 下关闭传输并迁移到 Disconnected；
    /// 已经 Disconnected 时是无声的 no-op。
    pub async fn disconnect(&self) {
        let old = self.session.lock().unwrap().take();
        if let Some(session) = old {
            let _ = session.close().await;
        }

        match self.state() {
            ConnectionState::Connected | ConnectionState::Failed(_) => {
                self.transition(ConnectionState::Disconnected);
            }
            other => {
                debug!("[Session] Disconnect from {} is a no-op", other.label());
            }
        }
    }

    /// 串行化门：所有命令执行与文件传输都必须经过这里
    ///
    /// 第二个调用方按 BusyPolicy 排队或收到 Busy。操作报告连接断开时，
    /// 本方法把会话标记为死亡并迁移到 `Failed("connection lost")`；
    /// 不做任何静默重连，重连永远是调用方的显式动作。
    pub async fn with_session<T, F, Fut>(&self, op: F) -> Result<T, SessionError>
    where
        F: FnOnce(Arc<DutSession>) -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        let policy = self.config.lock().unwrap().busy_policy;
        let _permit = self.gate.acquire(policy).await?;

        let session = {
            let guard = self.session.lock().unwrap();
            match guard.as_ref() {
                Some(session) if session.is_alive() && self.state().is_connected() => {
                    session.clone()
                }
                _ => return Err(SessionError::NotConnected),
            }
        };

        let result = op(session).await;

        if let Err(e) = &result {
            if e.is_connection_lost() {
                self.handle_connection_lost();
                return Err(SessionError::ConnectionLost);
            }
        }

        result
    }

    /// 执行一条命令（使用配置的命令超时）
    ///
    /// 超时与非零退出都在 CommandResult 里上报；执行期间断线的结果
    /// 同样返回给调用方，同时驱动状态机进入 Failed。
    pub async fn run_command(&self, command: &str) -> Result<CommandResult, SessionError> {
        // 空命令在触网之前就拒绝，也不占用操作门
        if command.trim().is_empty() {
            return Err(SessionError::Command(CommandError::Empty));
        }

        let timeout = self.config.lock().unwrap().command_timeout();

        let result = self
            .with_session(|session| async move {
                let channel = session.open_exec().await.map_err(SessionError::from)?;
                let executor = CommandExecutor::new(timeout);
                executor
                    .execute(&channel, command)
                    .await
                    .map_err(SessionError::from)
            })
            .await?;

        if result.outcome == CommandOutcome::ConnectionLost {
            self.handle_connection_lost();
        }

        Ok(result)
    }

    /// 传输匹配 pattern 的远程文件到本地目录
    pub async fn transfer(
        &self,
        pattern: &str,
        dest_dir: &Path,
    ) -> Result<TransferReport, SessionError> {
        self.transfer_with_cancel(pattern, dest_dir, &CancellationToken::new())
            .await
    }

    /// 传输（带协作式取消）
    pub async fn transfer_with_cancel(
        &self,
        pattern: &str,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, SessionError> {
        let report = self
            .with_session(|session| async move {
                let remote = SftpRemote::open(&session).await.map_err(SessionError::from)?;
                let engine = FileTransferEngine::default();
                engine
                    .transfer(&remote, pattern, dest_dir, cancel)
                    .await
                    .map_err(SessionError::from)
            })
            .await?;

        info!("[Session] Transfer finished: {}", report.summary());

        if report.termination == TransferTermination::ConnectionLost {
            self.handle_connection_lost();
        }

        Ok(report)
    }

    /// 探测连接是否仍然可用
    ///
    /// 通过操作门执行一条简单的探测命令；探测死于断线时状态机照常
    /// 进入 Failed，调用方由此得知需要显式重连。
    pub async fn verify(&self) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.run_command("true").await {
            Ok(result) => result.is_success(),
            Err(e) => {
                debug!("[Session] Verify probe failed: {}", e);
                false
            }
        }
    }

    /// 状态迁移 + 发布
    fn transition(&self, next: ConnectionState) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.can_transition_to(&next) {
                debug!(
                    "[Session] Transition {} -> {} is outside the state chart",
                    state, next
                );
            }
            info!("[Session] State: {} -> {}", state, next);
            *state = next.clone();
        }
        self.publish(&next);
    }

    /// 通知所有发布器（锁外调用，回调里可以再注册/订阅）
    fn publish(&self, state: &ConnectionState) {
        let publishers = self.publishers.lock().unwrap().clone();
        for publisher in publishers {
            publisher.on_state_changed(state);
        }
    }

    /// 操作期间发现连接断开
    fn handle_connection_lost(&self) {
        if let Some(session) = self.session.lock().unwrap().as_ref() {
            session.mark_disconnected();
        }
        if self.state() == ConnectionState::Connected {
            warn!("[Session] Connection lost");
            self.transition(ConnectionState::Failed("connection lost".to_string()));
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
