// 远程通配符解析
// 把带 */? 的远程路径展开成具体文件列表。
// 异构嵌入式 shell 的 glob 支持参差不齐，所以只向远端要一次父目录
// 列表，匹配在本地完成，绝不信任远端的 glob 展开。

use thiserror::Error;
use tracing::debug;

use super::remote_fs::RemoteFs;
use crate::models::transfer::RemoteFileEntry;
use crate::ssh::error::SshError;

/// 解析错误
///
/// "没有文件匹配" 不是错误，返回空列表；只有列目录本身失败才报错。
#[derive(Debug, Error)]
pub enum GlobError {
    /// 模式不合法（非绝对路径、通配符出现在最后一段之外等）
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 远程列目录失败
    #[error("remote listing failed: {0}")]
    List(#[from] SshError),
}

/// 远程通配符解析器
///
/// 模式是一个绝对远程路径，只有最后一段允许包含 `*` / `?`。
pub struct RemoteGlobResolver;

impl RemoteGlobResolver {
    /// 解析模式，返回按路径字典序排列的文件条目
    pub async fn resolve(
        remote: &dyn RemoteFs,
        pattern: &str,
    ) -> Result<Vec<RemoteFileEntry>, GlobError> {
        let (dir, leaf) = Self::split_pattern(pattern)?;

        debug!("[Glob] Listing {} for pattern '{}'", dir, leaf);
        let entries = remote.read_dir(&dir).await?;

        let mut matched: Vec<RemoteFileEntry> = entries
            .into_iter()
            .filter(|entry| !entry.is_dir && wildcard_match(leaf, entry.file_name()))
            .collect();

        matched.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("[Glob] Pattern '{}' matched {} files", pattern, matched.len());
        Ok(matched)
    }

    /// 拆分模式为（父目录, 最后一段）
    fn split_pattern(pattern: &str) -> Result<(String, &str), GlobError> {
        let invalid = |reason: &str| GlobError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must be an absolute remote path"));
        }

        let (dir, leaf) = pattern
            .rsplit_once('/')
            .expect("absolute path always contains '/'");

        if leaf.is_empty() {
            return Err(invalid("pattern must name a file, not a directory"));
        }
        if dir.contains('*') || dir.contains('?') {
            return Err(invalid(
                "wildcards are only allowed in the final path segment",
            ));
        }

        let dir = if dir.is_empty() { "/".to_string() } else { dir.to_string() };
        Ok((dir, leaf))
    }
}

/// 最后一段的通配符匹配
///
/// `*` 匹配任意串，`?` 匹配单个字符；按 shell 惯例，模式不以 `.`
/// 开头时不匹配隐藏文件。
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    if name.starts_with('.') && !pattern.starts_with('.') {
        return false;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    // 经典双指针 + 星号回溯
    let (mut p, mut n) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}
