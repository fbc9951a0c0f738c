// 数据模型
//
// - state: 连接状态机
// - command: 命令执行结果
// - transfer: 远程文件条目与传输报告

pub mod command;
pub mod state;
pub mod transfer;

pub use command::{CommandOutcome, CommandResult, RawCommandOutput};
pub use state::ConnectionState;
pub use transfer::{
    FileOutcome, FileReport, RemoteFileEntry, TransferFailure, TransferReport,
    TransferTermination,
};
