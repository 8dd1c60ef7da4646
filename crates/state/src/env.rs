use anyhow::Result;
use std::path::PathBuf;

/// Returns the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
    #[cfg(unix)]
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("home directory not found"))
}

/// Returns `~/.zkmcp`.
pub fn state_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".zkmcp"))
}

/// Path of the approval snapshot: `ZKMCP_APPROVALS_FILE` or `~/.zkmcp/approvals.json`.
pub fn approvals_file() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ZKMCP_APPROVALS_FILE") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(state_dir()?.join("approvals.json"))
}

/// Reads a boolean flag from the environment (`1`/`true` and `0`/`false`).
pub fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| {
        if s == "1" || s.eq_ignore_ascii_case("true") {
            Some(true)
        } else if s == "0" || s.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    })
}

/// Reads an unsigned integer from the environment; unparsable values are ignored.
pub fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
