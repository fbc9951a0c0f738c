// 命令清单加载
// 解析 `label = command` 格式的命令清单文本；会话核心只消费
// 解析好的命令字符串，从不接触这个文件格式。

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// 一条操作员预置命令
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandItem {
    /// 显示名称
    pub label: String,
    /// 命令文本（原样传给执行器）
    pub command: String,
}

/// 解析命令清单文本
///
/// 每行 `label = command`；空行与 `#` 注释忽略；没有 `=` 或两侧为空的
/// 行跳过。`=` 只在第一次出现处切分，命令内的 `=` 原样保留。
pub fn parse_command_list(text: &str) -> Vec<CommandItem> {
    let mut items = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((label, command)) = line.split_once('=') else {
            continue;
        };
        let label = label.trim();
        let command = command.trim();
        if !label.is_empty() && !command.is_empty() {
            items.push(CommandItem {
                label: label.to_string(),
                command: command.to_string(),
            });
        }
    }

    items
}

/// 从文件加载命令清单
pub async fn load_command_file(path: &Path) -> std::io::Result<Vec<CommandItem>> {
    let text = tokio::fs::read_to_string(path).await?;
    let items = parse_command_list(&text);
    debug!("[Commands] Loaded {} commands from {:?}", items.len(), path);
    Ok(items)
}
