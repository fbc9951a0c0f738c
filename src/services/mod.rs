// 服务层
//
// - exec: 命令执行器
// - remote_fs: 远程文件系统接口 (SFTP)
// - glob: 远程通配符解析
// - transfer: 文件传输引擎
// - commands: 命令清单加载

pub mod commands;
pub mod exec;
pub mod glob;
pub mod remote_fs;
pub mod transfer;

pub use commands::{load_command_file, parse_command_list, CommandItem};
pub use exec::{CommandChannel, CommandError, CommandExecutor};
pub use glob::{GlobError, RemoteGlobResolver};
pub use remote_fs::{RemoteFs, SftpRemote};
pub use transfer::{FileTransferEngine, TransferError};
