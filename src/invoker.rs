use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::CapfetchError;

pub const MAX_OUTPUT_BYTES: usize = 2 * 1024 * 1024; // 2MB

/// Everything one generator run produced. Exit status is carried
/// unjudged — success/failure policy belongs to the caller.
#[derive(Debug)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExitStatus,
}

/// Runs the captcha generator as a one-shot subprocess.
///
/// Safety features:
/// - No shell interpolation (Command::new, no arguments at all)
/// - kill_on_drop(true) prevents zombie processes
/// - Output capped at MAX_OUTPUT_BYTES on both pipes
/// - Piped stdout/stderr, null stdin (no terminal leakage)
/// - On timeout the entire process group is killed; no bytes from a
///   timed-out run can ever surface on a later call
pub struct Invoker {
    executable: PathBuf,
}

impl Invoker {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Spawn the generator, wait up to `timeout`, and return its full
    /// stdout/stderr plus exit status. The wait is call-scoped: the
    /// child is spawned, reaped, and (on timeout) killed entirely within
    /// this call — no subprocess state is retained afterward.
    pub async fn run(&self, timeout: Duration) -> Result<CapturedOutput, CapfetchError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.executable);
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .process_group(0) // Kill entire process tree on timeout, not just top-level
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| CapfetchError::Spawn {
            path: self.executable.clone(),
            source: e,
        })?;

        // process_group(0) makes the child its own group leader
        // (pgid == pid), so we can SIGKILL the whole group by pid.
        let child_pid = child.id();

        // Take pipe handles for capped reading — prevents OOM from a
        // runaway generator. Unlike wait_with_output() which buffers ALL
        // output, take() caps at MAX_OUTPUT_BYTES.
        let stdout_pipe = child.stdout.take().expect("stdout was piped");
        let stderr_pipe = child.stderr.take().expect("stderr was piped");

        let read_future = async {
            // Read both pipes concurrently; whichever finishes first is
            // checked against the cap. A capped pipe means the child may
            // be blocked writing — kill the group to unblock the other
            // reader (which waits for EOF that only comes on child exit).
            let mut stdout_handle = tokio::spawn(async move {
                let mut buf = Vec::with_capacity(MAX_OUTPUT_BYTES.min(64 * 1024));
                let mut capped = stdout_pipe.take(MAX_OUTPUT_BYTES as u64);
                if let Err(e) = capped.read_to_end(&mut buf).await {
                    tracing::warn!("stdout pipe read error: {e}");
                }
                buf
            });

            let mut stderr_handle = tokio::spawn(async move {
                let mut buf = Vec::with_capacity(64 * 1024);
                let mut capped = stderr_pipe.take(MAX_OUTPUT_BYTES as u64);
                if let Err(e) = capped.read_to_end(&mut buf).await {
                    tracing::warn!("stderr pipe read error: {e}");
                }
                buf
            });

            let (stdout_buf, stderr_buf) = tokio::select! {
                result = &mut stdout_handle => {
                    let buf = result.unwrap_or_default();
                    if buf.len() >= MAX_OUTPUT_BYTES
                        && let Some(pid) = child_pid
                    {
                        kill_group(pid);
                    }
                    let stderr_buf = stderr_handle.await.unwrap_or_default();
                    (buf, stderr_buf)
                }
                result = &mut stderr_handle => {
                    let buf = result.unwrap_or_default();
                    if buf.len() >= MAX_OUTPUT_BYTES
                        && let Some(pid) = child_pid
                    {
                        kill_group(pid);
                    }
                    let stdout_buf = stdout_handle.await.unwrap_or_default();
                    (stdout_buf, buf)
                }
            };
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout_buf, stderr_buf, status))
        };

        match tokio::time::timeout(timeout, read_future).await {
            Ok(result) => {
                let (stdout, stderr, status) = result?;
                Ok(CapturedOutput {
                    stdout,
                    stderr,
                    status,
                })
            }
            Err(_) => {
                // Timeout: kill the process group, not just the leader.
                // Partial bytes are deliberately discarded.
                if let Some(pid) = child_pid {
                    kill_group(pid);
                }
                let elapsed_ms = start.elapsed().as_millis() as u64;
                Err(CapfetchError::Timeout(elapsed_ms))
            }
        }
    }
}

/// SIGKILL a whole process group. start_kill() only reaches the direct
/// child; grandchildren would survive holding pipes open.
fn kill_group(pid: u32) {
    unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
    }
}
