// 状态发布
// SessionManager 每次状态迁移都会通知所有已注册的 StatusPublisher。
// 回调可能来自 tokio 工作线程；需要线程亲和的消费者（例如 GUI）
// 自行负责切回自己的线程。

use crate::models::state::ConnectionState;

/// 状态发布回调契约
pub trait StatusPublisher: Send + Sync {
    /// 状态发生迁移
    fn on_state_changed(&self, state: &ConnectionState);
}

/// 任意闭包都可以作为发布器
impl<F> StatusPublisher for F
where
    F: Fn(&ConnectionState) + Send + Sync,
{
    fn on_state_changed(&self, state: &ConnectionState) {
        self(state);
    }
}
