// DutLink - DUT SSH 远程会话管理
//
// 通过 SSH 控制远程嵌入式设备（DUT）：维护连接、执行 shell 命令、
// 按通配符把设备上的文件拉回本地目录。
//
// 模块结构:
// - models: 数据模型（状态机、命令结果、传输报告）
// - ssh: 传输层（配置、客户端、会话、管理器）
// - services: 服务层（执行器、glob 解析、传输引擎、命令清单）
//
// 图形界面、设置持久化、打包脚本等都是外部协作者，不在本 crate 内。

pub mod models;
pub mod services;
pub mod ssh;

// 公开导出
pub use models::command::{CommandOutcome, CommandResult, RawCommandOutput};
pub use models::state::ConnectionState;
pub use models::transfer::{
    FileOutcome, FileReport, RemoteFileEntry, TransferFailure, TransferReport,
    TransferTermination,
};
pub use services::commands::{load_command_file, parse_command_list, CommandItem};
pub use services::exec::{CommandChannel, CommandError, CommandExecutor};
pub use services::glob::{GlobError, RemoteGlobResolver};
pub use services::remote_fs::{RemoteFs, SftpRemote};
pub use services::transfer::{FileTransferEngine, TransferError};
pub use ssh::config::{AuthMethod, BusyPolicy, KeepaliveConfig, SessionConfig};
pub use ssh::error::{SessionError, SshError};
pub use ssh::event::StatusPublisher;
pub use ssh::manager::SessionManager;
pub use ssh::session::{DutSession, ExecChannel};
