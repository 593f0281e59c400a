//! Container-engine command surface.
//!
//! Builds the argv for every engine interaction and hands it to the process
//! runner. The engine binary is configurable; `docker` is the default and
//! anything argv-compatible with it (e.g. `podman`) works unchanged.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::config::Config;
use crate::exec::{CommandSpec, ProcessRunner};
use crate::models::ContainerRecord;
use crate::{AppError, Result};

/// Output template for the container listing; one record per line,
/// pipe-delimited.
pub const PS_FORMAT: &str =
    r#"{{.Names}}|{{.Image}}|{{.Status}}|{{.Label "com.docker.compose.project"}}|{{.RunningFor}}"#;

/// Argv construction and invocation for the configured container engine.
#[derive(Clone)]
pub struct ComposeEngine {
    binary: String,
    discovery_timeout: Duration,
    runner: ProcessRunner,
}

impl ComposeEngine {
    /// Construct the engine surface from configuration.
    #[must_use]
    pub fn new(config: &Config, runner: ProcessRunner) -> Self {
        Self {
            binary: config.engine_binary.clone(),
            discovery_timeout: config.discovery_timeout(),
            runner,
        }
    }

    /// The configured engine binary name.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Poll the engine for all live containers.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ProcessExit`] when the listing command fails,
    /// plus the runner's launch/wait errors.
    pub async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        let spec = CommandSpec::new([self.binary.as_str(), "ps", "--format", PS_FORMAT]);
        let output = self.runner.run_captured(&spec).await?;
        if !output.success() {
            return Err(AppError::ProcessExit(format!(
                "{} ps exited with code {}: {}",
                self.binary,
                output.code,
                output.stderr.trim()
            )));
        }
        Ok(output
            .stdout
            .lines()
            .filter_map(ContainerRecord::parse_line)
            .collect())
    }

    /// Bring a project up detached, scoped to an env file and a template
    /// file. Output is streamed to the activity log; returns the exit code.
    ///
    /// # Errors
    ///
    /// Returns the runner's launch/wait errors.
    pub async fn up(&self, project: &str, env_file: &Path, compose_file: &Path) -> Result<i32> {
        let env_file = env_file.to_string_lossy();
        let compose_file = compose_file.to_string_lossy();
        let spec = CommandSpec::new([
            self.binary.as_str(),
            "compose",
            "-p",
            project,
            "--env-file",
            env_file.as_ref(),
            "-f",
            compose_file.as_ref(),
            "up",
            "-d",
        ]);
        self.runner.run_streamed(&spec).await
    }

    /// Tear a project down by name. Output is streamed to the activity
    /// log; returns the exit code.
    ///
    /// # Errors
    ///
    /// Returns the runner's launch/wait errors.
    pub async fn down(&self, project: &str) -> Result<i32> {
        let spec = CommandSpec::new([self.binary.as_str(), "compose", "-p", project, "down"]);
        self.runner.run_streamed(&spec).await
    }

    /// Locate the engine executable on the search path, bounded by the
    /// discovery timeout. Returns the first reported path, if any.
    pub async fn locate_binary(&self) -> Option<String> {
        let spec = lookup_command(&self.binary);
        match self
            .runner
            .run_captured_timeout(&spec, self.discovery_timeout)
            .await
        {
            Ok(output) if output.success() => output
                .stdout
                .lines()
                .next()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
            Ok(_) => None,
            Err(err) => {
                warn!(%err, "engine discovery failed");
                None
            }
        }
    }
}

#[cfg(windows)]
fn lookup_command(binary: &str) -> CommandSpec {
    CommandSpec::new(["where", binary])
}

#[cfg(not(windows))]
fn lookup_command(binary: &str) -> CommandSpec {
    CommandSpec::new(["which", binary])
}
