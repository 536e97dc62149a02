use std::env;
use std::path::PathBuf;

use crate::error::CapfetchError;

/// Default per-call budget when the caller does not pass one.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Name of the generator binary inside the resource directory.
const GENERATOR_NAME: &str = "capgen";

/// Env var overriding generator resolution entirely.
const GENERATOR_ENV: &str = "CAPFETCH_GENERATOR";

#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to the generator executable.
    pub executable: PathBuf,
    /// Default timeout applied by `CaptchaClient::get`.
    pub default_timeout_ms: u64,
}

impl Config {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Resolve the generator from the installed resource layout.
    ///
    /// Order: `CAPFETCH_GENERATOR` env override, then `priv/capgen` next
    /// to the current executable, then the cargo project root
    /// (development builds: target/release/../../priv). Callers may
    /// start with any CWD, so every candidate is exe-relative.
    pub fn resolve() -> Result<Self, CapfetchError> {
        if let Ok(path) = env::var(GENERATOR_ENV) {
            return Ok(Self::new(PathBuf::from(path)));
        }

        let mut searched = Vec::new();

        if let Ok(exe) = env::current_exe()
            && let Some(dir) = exe.parent()
        {
            let installed = dir.join("priv").join(GENERATOR_NAME);
            if installed.is_file() {
                return Ok(Self::new(installed));
            }
            searched.push(installed);

            let dev_tree = dir.join("../../priv").join(GENERATOR_NAME);
            if dev_tree.is_file() {
                return Ok(Self::new(dev_tree));
            }
            searched.push(dev_tree);
        }

        tracing::warn!(
            "{GENERATOR_ENV} not set and no bundled generator found — captcha unavailable"
        );
        Err(CapfetchError::NotFound { searched })
    }
}
