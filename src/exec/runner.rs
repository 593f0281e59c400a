//! Spawning and supervising single external processes.
//!
//! Every engine and source-control interaction goes through
//! [`ProcessRunner`]. Invocations are argv vectors, never shell strings. The
//! runner guarantees nothing about ordering; absence of overlapping
//! invocations is the command queue's job.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::activity::ActivityLog;
use crate::{AppError, Result};

/// One external-process invocation: argv plus optional working directory
/// and environment overrides.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Build a spec from an argv vector; the first element is the program.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Set the working directory for the invocation.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add one environment override for the invocation.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The program name, for diagnostics.
    #[must_use]
    pub fn program(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    /// The argv joined with spaces, for logging.
    #[must_use]
    pub fn display_line(&self) -> String {
        self.argv.join(" ")
    }

    fn build(&self) -> Result<Command> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| AppError::ProcessLaunch("empty command line".to_owned()))?;
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        Ok(command)
    }
}

/// Captured output of a completed invocation.
#[derive(Debug)]
pub struct CapturedOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub code: i32,
    /// Collected stdout.
    pub stdout: String,
    /// Collected stderr.
    pub stderr: String,
}

impl CapturedOutput {
    /// Whether the process exited with code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Both streams joined for diagnostics, stdout first.
    #[must_use]
    pub fn merged(&self) -> String {
        let mut merged = self.stdout.trim_end().to_owned();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !merged.is_empty() {
                merged.push('\n');
            }
            merged.push_str(stderr);
        }
        merged
    }
}

/// Spawns external processes on behalf of queue tasks and the reconciler.
#[derive(Clone)]
pub struct ProcessRunner {
    log: Arc<ActivityLog>,
}

impl ProcessRunner {
    /// Construct a runner that streams process output into `log`.
    #[must_use]
    pub fn new(log: Arc<ActivityLog>) -> Self {
        Self { log }
    }

    /// Run an invocation to completion, forwarding every line of stdout and
    /// stderr to the activity log as it is produced. Returns the exit code;
    /// a non-zero code is not an error, the caller decides.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ProcessLaunch`] when the process cannot be
    /// spawned and [`AppError::Interrupted`] when reading its output or
    /// waiting for its exit fails.
    pub async fn run_streamed(&self, spec: &CommandSpec) -> Result<i32> {
        debug!(command = %spec.display_line(), "spawning streamed process");
        let mut command = spec.build()?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = command
            .spawn()
            .map_err(|e| AppError::ProcessLaunch(format!("{}: {e}", spec.program())))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::ProcessLaunch("failed to capture stderr".to_owned()))?;
        let stderr_log = Arc::clone(&self.log);
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                stderr_log.append(&line);
            }
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::ProcessLaunch("failed to capture stdout".to_owned()))?;
        let mut lines = BufReader::new(stdout).lines();
        let mut read_failure = None;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => self.log.append(&line),
                Ok(None) => break,
                Err(e) => {
                    read_failure = Some(AppError::Interrupted(format!(
                        "reading output of {}: {e}",
                        spec.program()
                    )));
                    break;
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            AppError::Interrupted(format!("waiting for {}: {e}", spec.program()))
        })?;
        let _ = stderr_task.await;
        if let Some(failure) = read_failure {
            return Err(failure);
        }

        let code = status.code().unwrap_or(-1);
        self.log.append(&format!("Command exited with code: {code}"));
        Ok(code)
    }

    /// Run an invocation to completion, collecting stdout and stderr.
    /// Nothing is written to the activity log; callers log what matters to
    /// them. A non-zero exit code is not an error, the caller decides.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ProcessLaunch`] when the process cannot be
    /// spawned and [`AppError::Interrupted`] when waiting for it fails.
    pub async fn run_captured(&self, spec: &CommandSpec) -> Result<CapturedOutput> {
        debug!(command = %spec.display_line(), "spawning captured process");
        let mut command = spec.build()?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = command
            .spawn()
            .map_err(|e| AppError::ProcessLaunch(format!("{}: {e}", spec.program())))?;
        let output = child.wait_with_output().await.map_err(|e| {
            AppError::Interrupted(format!("waiting for {}: {e}", spec.program()))
        })?;
        Ok(CapturedOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// [`Self::run_captured`] bounded by `limit`; used for auxiliary
    /// discovery calls that must never hang the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Interrupted`] when the bound elapses, plus
    /// everything [`Self::run_captured`] returns.
    pub async fn run_captured_timeout(
        &self,
        spec: &CommandSpec,
        limit: Duration,
    ) -> Result<CapturedOutput> {
        match tokio::time::timeout(limit, self.run_captured(spec)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Interrupted(format!(
                "{} did not finish within {limit:?}",
                spec.display_line()
            ))),
        }
    }
}
