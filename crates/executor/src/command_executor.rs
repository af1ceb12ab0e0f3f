use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::process_group;

/// How long readers may keep flushing after the process tree was killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Command exited with {}", describe_exit(.code))]
    NonZeroExit { code: Option<i32> },
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// A single command line to run with a wall-clock budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.program.trim().is_empty() {
            return Err(ExecutorError::InvalidInvocation(
                "program cannot be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ExecutorError::InvalidInvocation(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Terminal condition of a process that was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited,
    Failed { code: Option<i32> },
    TimedOut { after: Duration },
}

/// Combined stdout/stderr text of a run and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub output: String,
    pub termination: Termination,
    pub elapsed: Duration,
}

impl RunOutput {
    pub fn is_success(&self) -> bool {
        matches!(self.termination, Termination::Exited)
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.termination, Termination::TimedOut { .. })
    }

    /// Returns the captured text, or the error matching a non-clean termination.
    pub fn into_result(self) -> Result<String, ExecutorError> {
        match self.termination {
            Termination::Exited => Ok(self.output),
            Termination::Failed { code } => Err(ExecutorError::NonZeroExit { code }),
            Termination::TimedOut { after } => Err(ExecutorError::Timeout(after)),
        }
    }
}

/// Launches external processes. Implemented by [`TokioCommandExecutor`] and by
/// test doubles that script outputs without spawning anything.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput, ExecutorError>;
}

/// Runs commands with `tokio::process`, killing the whole process group on timeout.
#[derive(Debug, Clone)]
pub struct TokioCommandExecutor {
    drain_grace: Duration,
}

impl TokioCommandExecutor {
    pub fn new() -> Self {
        Self {
            drain_grace: DRAIN_GRACE,
        }
    }

    pub fn with_drain_grace(mut self, drain_grace: Duration) -> Self {
        self.drain_grace = drain_grace;
        self
    }
}

impl Default for TokioCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for TokioCommandExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput, ExecutorError> {
        invocation.validate()?;

        tracing::debug!(
            "Executing command: {} {:?} (timeout {:?})",
            invocation.program,
            invocation.args,
            invocation.timeout
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        process_group::detach(&mut cmd);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ExecutorError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        let pid = child.id();

        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut readers: Vec<JoinHandle<io::Result<()>>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, Arc::clone(&sink))));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, Arc::clone(&sink))));
        }

        let mut tree_killed = false;
        let mut termination = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                if status.success() {
                    Termination::Exited
                } else {
                    Termination::Failed {
                        code: status.code(),
                    }
                }
            }
            Err(_) => {
                tracing::warn!(
                    "Command {} exceeded {:?}, killing process tree",
                    invocation.program,
                    invocation.timeout
                );
                kill_group(pid);
                tree_killed = true;
                // Reaps the direct child; a no-op error if it is already gone.
                if let Err(e) = child.kill().await {
                    tracing::debug!("Kill after timeout reported: {}", e);
                }
                Termination::TimedOut {
                    after: invocation.timeout,
                }
            }
        };

        // One deadline shared by all readers. A descendant still holding a pipe
        // open past it gets its group killed before the readers are abandoned.
        let mut deadline = if tree_killed {
            tokio::time::Instant::now() + self.drain_grace
        } else {
            tokio::time::Instant::from_std(started + invocation.timeout)
        };
        for mut reader in readers {
            let mut finished = tokio::time::timeout_at(deadline, &mut reader).await;
            if finished.is_err() && !tree_killed {
                tracing::warn!(
                    "Output of {} still open after {:?}, killing process tree",
                    invocation.program,
                    invocation.timeout
                );
                kill_group(pid);
                tree_killed = true;
                termination = Termination::TimedOut {
                    after: invocation.timeout,
                };
                deadline = tokio::time::Instant::now() + self.drain_grace;
                finished = tokio::time::timeout_at(deadline, &mut reader).await;
            }
            match finished {
                Ok(Ok(Err(e))) => tracing::debug!("Output reader failed: {}", e),
                Ok(_) => {}
                Err(_) => {
                    tracing::debug!("Output reader still open, abandoning");
                    reader.abort();
                }
            }
        }

        let bytes = std::mem::take(&mut *sink.lock().await);
        let elapsed = started.elapsed();
        tracing::debug!(
            "Command {} finished: {:?} after {:?} ({} bytes)",
            invocation.program,
            termination,
            elapsed,
            bytes.len()
        );

        Ok(RunOutput {
            output: String::from_utf8_lossy(&bytes).into_owned(),
            termination,
            elapsed,
        })
    }
}

fn kill_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        if let Err(e) = process_group::kill_tree(pid) {
            tracing::warn!("Failed to kill process group {}: {}", pid, e);
        }
    }
}

/// Appends everything `reader` yields to the shared buffer, in arrival order.
async fn drain<R>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock().await.extend_from_slice(&buf[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("trid", Duration::from_secs(1))
            .arg("-v")
            .args(["-n:3", "file.bin"]);
        assert_eq!(inv.program, "trid");
        assert_eq!(
            inv.args,
            vec![
                OsString::from("-v"),
                OsString::from("-n:3"),
                OsString::from("file.bin")
            ]
        );
    }

    #[test]
    fn test_invocation_rejects_empty_program() {
        let inv = Invocation::new("  ", Duration::from_secs(1));
        assert!(matches!(
            inv.validate(),
            Err(ExecutorError::InvalidInvocation(_))
        ));
    }

    #[test]
    fn test_invocation_rejects_zero_timeout() {
        let inv = Invocation::new("trid", Duration::ZERO);
        assert!(matches!(
            inv.validate(),
            Err(ExecutorError::InvalidInvocation(_))
        ));
    }

    #[test]
    fn test_into_result_mapping() {
        let ok = RunOutput {
            output: "done".into(),
            termination: Termination::Exited,
            elapsed: Duration::from_millis(5),
        };
        assert!(ok.is_success());
        assert_eq!(ok.into_result().unwrap(), "done");

        let failed = RunOutput {
            output: String::new(),
            termination: Termination::Failed { code: Some(2) },
            elapsed: Duration::from_millis(5),
        };
        assert!(matches!(
            failed.into_result(),
            Err(ExecutorError::NonZeroExit { code: Some(2) })
        ));

        let timed_out = RunOutput {
            output: "partial".into(),
            termination: Termination::TimedOut {
                after: Duration::from_millis(10),
            },
            elapsed: Duration::from_millis(12),
        };
        assert!(timed_out.timed_out());
        assert!(matches!(
            timed_out.into_result(),
            Err(ExecutorError::Timeout(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = ExecutorError::NonZeroExit { code: Some(1) };
        assert_eq!(err.to_string(), "Command exited with status 1");
        let err = ExecutorError::NonZeroExit { code: None };
        assert_eq!(err.to_string(), "Command exited with a signal");
    }

    #[tokio::test]
    async fn test_invalid_invocation_is_not_spawned() {
        let executor = TokioCommandExecutor::new();
        let result = executor.run(&Invocation::new("", Duration::from_secs(1))).await;
        assert!(matches!(result, Err(ExecutorError::InvalidInvocation(_))));
    }
}
