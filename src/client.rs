use std::time::Duration;

use crate::config::Config;
use crate::error::CapfetchError;
use crate::invoker::Invoker;
use crate::parsers::gif::CHALLENGE_LEN;
use crate::parsers::{Captcha, GifParser, OutputParser};

/// Facade over one generator executable. `get` blocks the calling task
/// until the subprocess completes, times out, or fails; concurrent calls
/// each own their subprocess — nothing is shared between them.
///
/// There is no stale-result hazard to drain here: the subprocess wait is
/// call-scoped (spawn, wait-with-timeout, reap all inside `run`), not a
/// completion message delivered to a shared inbox.
pub struct CaptchaClient {
    invoker: Invoker,
    parser: GifParser,
    default_timeout_ms: u64,
}

impl CaptchaClient {
    pub fn new(config: Config) -> Self {
        Self {
            invoker: Invoker::new(config.executable),
            parser: GifParser,
            default_timeout_ms: config.default_timeout_ms,
        }
    }

    /// Resolve the bundled generator and build a client around it.
    pub fn from_resources() -> Result<Self, CapfetchError> {
        Ok(Self::new(Config::resolve()?))
    }

    /// Fetch one captcha with the configured default timeout (2000 ms
    /// unless overridden in `Config`).
    pub async fn get(&self) -> Result<Captcha, CapfetchError> {
        self.get_with_timeout(self.default_timeout_ms).await
    }

    /// Fetch one captcha, waiting up to `timeout_ms` for the generator.
    ///
    /// Outcome mapping, in order:
    /// - generator did not finish in time → `Timeout` (nothing is parsed)
    /// - non-zero exit → `ProcessExit` (captured bytes are not trusted)
    /// - clean exit but fewer than 5 bytes → `Parse("insufficient data")`
    /// - otherwise the parser's verdict, success or failure, verbatim
    pub async fn get_with_timeout(&self, timeout_ms: u64) -> Result<Captcha, CapfetchError> {
        let captured = self
            .invoker
            .run(Duration::from_millis(timeout_ms))
            .await?;

        if !captured.status.success() {
            let code = captured.status.code().unwrap_or(-1);
            tracing::warn!(
                executable = %self.invoker.executable().display(),
                code,
                "captcha generator failed"
            );
            return Err(CapfetchError::ProcessExit {
                code,
                stderr: String::from_utf8_lossy(&captured.stderr).to_string(),
            });
        }

        // Log stderr at debug level even on success (progress info, etc.)
        if !captured.stderr.is_empty() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&captured.stderr),
                "generator stderr output"
            );
        }

        // Anything shorter than a full challenge is rejected before the
        // parser is even consulted.
        if captured.stdout.len() < CHALLENGE_LEN {
            return Err(CapfetchError::Parse("insufficient data".to_string()));
        }

        self.parser.parse(&captured.stdout)
    }
}
