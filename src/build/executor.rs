/// Step executor
///
/// Runs a step through the shell in the build root and streams both output
/// channels to the console while the process runs.
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cli_utils::{write_line, Style};
use crate::error::BuildError;

/// How long to keep draining after the shell exits. A background process
/// that inherited the pipes would otherwise keep them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Result of step execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Stdout,
    Stderr,
}

/// Step executor
#[derive(Debug, Clone)]
pub struct StepExecutor {
    shell: String,
    working_dir: PathBuf,
    ansi: bool,
}

impl StepExecutor {
    pub fn new(shell: impl Into<String>, working_dir: impl Into<PathBuf>, ansi: bool) -> Self {
        Self {
            shell: shell.into(),
            working_dir: working_dir.into(),
            ansi,
        }
    }

    /// Run `step` as `<shell> -c <step>` and wait for it to exit.
    ///
    /// A process that cannot be spawned is a `StepStart` error; a nonzero exit
    /// is reported through the returned `ExecutionResult`.
    pub async fn run(&self, step: &str) -> Result<ExecutionResult, BuildError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(step)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            operation = "spawn",
            shell = %self.shell,
            cwd = %self.working_dir.display(),
            "starting step"
        );

        let mut child = cmd.spawn().map_err(|e| self.start_error(e))?;

        let stdout = child.stdout.take().map(|s| drain(s, Channel::Stdout, self.ansi));
        let stderr = child.stderr.take().map(|s| drain(s, Channel::Stderr, self.ansi));

        let status = child.wait().await.map_err(|e| self.start_error(e))?;

        for task in [stdout, stderr].into_iter().flatten() {
            finish_drain(task).await;
        }

        let result = ExecutionResult {
            exit_code: status.code(),
            duration: start.elapsed(),
        };

        debug!(
            operation = "exit",
            exit_code = ?result.exit_code,
            duration_ms = result.duration.as_millis() as u64,
            "step finished"
        );

        Ok(result)
    }

    fn start_error(&self, err: io::Error) -> BuildError {
        BuildError::StepStart {
            shell: self.shell.clone(),
            message: err.to_string(),
        }
    }
}

/// Forward `reader` line by line to the console on its own task
fn drain<R>(reader: R, channel: Channel, ansi: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    // Console write failures must not stall the child
                    let _ = match channel {
                        Channel::Stdout => {
                            write_line(&mut io::stdout().lock(), line, Style::Plain, ansi)
                        }
                        Channel::Stderr => {
                            write_line(&mut io::stderr().lock(), line, Style::Error, ansi)
                        }
                    };
                }
                Err(e) => {
                    debug!(channel = ?channel, "Failed to read child output: {}", e);
                    break;
                }
            }
        }

        if let Channel::Stdout = channel {
            let _ = io::stdout().flush();
        }
    })
}

async fn finish_drain(mut task: JoinHandle<()>) {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Err(e)) => debug!("Output drain task error: {:?}", e),
        Ok(Ok(())) => {}
        Err(_) => {
            debug!("Timeout waiting for output drain, pipes held open by another process");
            task.abort();
        }
    }
}
