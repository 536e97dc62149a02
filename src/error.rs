use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapfetchError {
    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("generator exited with code {code}: {stderr}")]
    ProcessExit { code: i32, stderr: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("failed to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generator executable not found (searched {searched:?})")]
    NotFound { searched: Vec<PathBuf> },

    #[error("pipe read from generator failed: {0}")]
    Read(#[from] std::io::Error),
}

impl CapfetchError {
    /// Returns true for transient errors that may succeed on retry.
    /// Only timeouts qualify — a larger budget may be enough. Exit codes
    /// and malformed output are deterministic for a given generator build.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Produce a sanitized error message safe for surfacing to end users.
    /// Does not leak filesystem paths or full stderr dumps.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(ms) => format!("captcha generation timed out after {ms}ms"),
            Self::ProcessExit { code, stderr } => {
                if stderr.trim().is_empty() {
                    format!("captcha generator exited with code {code}")
                } else {
                    // Take tail (last 200 chars) — generators dump banners
                    // first, the actual error is at the end.
                    let preview: String = stderr
                        .chars()
                        .rev()
                        .take(200)
                        .collect::<Vec<_>>()
                        .into_iter()
                        .rev()
                        .collect();
                    let prefix = if preview.len() < stderr.len() {
                        "..."
                    } else {
                        ""
                    };
                    format!("captcha generator exited with code {code}: {prefix}{preview}")
                }
            }
            Self::Parse(reason) => format!("captcha output unusable: {reason}"),
            Self::Spawn { .. } => "failed to start captcha generator".to_string(),
            Self::NotFound { .. } => "captcha generator is not installed".to_string(),
            Self::Read(_) => "failed to read captcha generator output".to_string(),
        }
    }
}
