//! Compose session lifecycle.
//!
//! The session remembers which project this tool launched and owns the
//! working directory holding the generated env file and compose template.
//! Exactly one mutable instance exists, inside the queue worker's context;
//! start, stop, and stop-all run as queued tasks and are the only writers.
//! State machine: Idle -> Starting -> Active -> Stopping -> Idle, with
//! Starting -> Idle on any failure.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use tempfile::TempDir;
use tracing::warn;

use crate::exec::QueueContext;
use crate::models::CompositionVersion;
use crate::reconcile;
use crate::{AppError, Result};

/// Bundled development-mode compose template.
const DEV_COMPOSE: &str = include_str!("../fixtures/dev-compose.yml");

/// Session bookkeeping: the active project and its working files.
pub struct ComposeSession {
    scratch: Option<TempDir>,
    scratch_error: Option<String>,
    active_project: Option<String>,
}

impl ComposeSession {
    /// Create the session working directory under `scratch_root`. On
    /// failure the session is constructed disabled: start/stop report
    /// [`AppError::ScratchDir`] while polling and manifest refresh stay
    /// operative.
    #[must_use]
    pub fn new(scratch_root: &Path) -> Self {
        match tempfile::Builder::new()
            .prefix("compose-pilot-session-")
            .tempdir_in(scratch_root)
        {
            Ok(dir) => Self {
                scratch: Some(dir),
                scratch_error: None,
                active_project: None,
            },
            Err(e) => {
                warn!("failed to create session working directory: {e}");
                Self {
                    scratch: None,
                    scratch_error: Some(e.to_string()),
                    active_project: None,
                }
            }
        }
    }

    /// Why lifecycle operations are disabled, when working-directory
    /// creation failed at startup.
    #[must_use]
    pub fn disabled_reason(&self) -> Option<&str> {
        self.scratch_error.as_deref()
    }

    /// Path of the session working directory, when it exists.
    #[must_use]
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    /// The currently active project label, if any.
    #[must_use]
    pub fn active_project(&self) -> Option<&str> {
        self.active_project.as_deref()
    }

    /// Mark a project active.
    pub fn activate(&mut self, project: String) {
        self.active_project = Some(project);
    }

    /// Clear the active project unconditionally.
    pub fn clear(&mut self) {
        self.active_project = None;
    }

    /// Take the active project, leaving the session idle.
    pub fn take_active(&mut self) -> Option<String> {
        self.active_project.take()
    }

    fn scratch_dir(&self) -> Result<&Path> {
        self.scratch.as_ref().map(TempDir::path).ok_or_else(|| {
            AppError::ScratchDir(format!(
                "session working directory unavailable: {}",
                self.scratch_error.as_deref().unwrap_or("not created")
            ))
        })
    }

    fn ensure_enabled(&self) -> Result<()> {
        self.scratch_dir().map(|_| ())
    }

    /// Write the env file and compose template for `pair` into the working
    /// directory, returning their paths.
    fn write_launch_files(
        &self,
        pair: &CompositionVersion,
        template: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let dir = self.scratch_dir()?;
        let env_file = dir.join(".env");
        std::fs::write(&env_file, format!("IMAGE_TAG={}\n", pair.version.ident))
            .map_err(|e| AppError::Io(format!("writing {}: {e}", env_file.display())))?;
        let compose_file = dir.join(format!("docker-compose-{}.yml", pair.composition.name));
        std::fs::write(&compose_file, template)
            .map_err(|e| AppError::Io(format!("writing {}: {e}", compose_file.display())))?;
        Ok((env_file, compose_file))
    }
}

/// Queue task: start `pair` as a new compose project.
///
/// # Errors
///
/// Returns [`AppError::SelectionConflict`] when a session is already
/// active (no process is spawned), [`AppError::ScratchDir`] when the
/// session is disabled, and any fetch/write/launch failure. The session
/// never stays active after a failed start.
pub async fn start(ctx: &mut QueueContext, pair: CompositionVersion) -> Result<()> {
    ctx.session.ensure_enabled()?;
    if let Some(active) = ctx.session.active_project() {
        return Err(AppError::SelectionConflict(format!(
            "project {active} is already active; stop it before starting another"
        )));
    }
    let project = pair.project_id();
    ctx.log
        .append(&format!("Starting {} as project {project}", pair.label()));
    ctx.session.activate(project.clone());
    if let Err(err) = launch(ctx, &pair, &project).await {
        // The session must never appear active after a failed start.
        ctx.session.clear();
        return Err(err);
    }
    ctx.log.append(&format!("Project {project} is up"));
    refresh_after(ctx).await;
    Ok(())
}

async fn launch(ctx: &mut QueueContext, pair: &CompositionVersion, project: &str) -> Result<()> {
    let template = if ctx.config.dev_mode {
        ctx.log.append("Using bundled development template");
        DEV_COMPOSE.to_owned()
    } else {
        let path = ctx.config.remote.template_path_for(&pair.composition.name);
        ctx.log.append(&format!("Fetching template {path}"));
        ctx.fetcher.fetch_file(&path).await?
    };
    let (env_file, compose_file) = ctx.session.write_launch_files(pair, &template)?;
    ctx.log.append(&format!(
        "Wrote environment file with IMAGE_TAG={}",
        pair.version.ident
    ));
    let code = ctx.engine.up(project, &env_file, &compose_file).await?;
    if code != 0 {
        return Err(AppError::ProcessExit(format!(
            "{} compose up exited with code {code}",
            ctx.engine.binary()
        )));
    }
    Ok(())
}

/// Queue task: stop the active project.
///
/// With no active session this logs a diagnostic and spawns no process.
/// The session is cleared optimistically before the `down` result is
/// known; a failed stop never resurrects it.
///
/// # Errors
///
/// Returns [`AppError::ScratchDir`] when the session is disabled and the
/// engine's launch/wait errors. A non-zero `down` exit is logged only.
pub async fn stop(ctx: &mut QueueContext) -> Result<()> {
    ctx.session.ensure_enabled()?;
    let Some(project) = ctx.session.take_active() else {
        ctx.log.append("No active project to stop");
        return Ok(());
    };
    ctx.log.append(&format!("Stopping project {project}"));
    let code = ctx.engine.down(&project).await?;
    if code != 0 {
        ctx.log.append(&format!(
            "Stopping {project} exited with code {code}; it may not have been running"
        ));
    }
    refresh_after(ctx).await;
    Ok(())
}

/// Queue task: stop every project currently observed as running.
///
/// Acts on the reconciler's running-project set, not the in-memory
/// session, so externally started projects are stopped too. The `down`
/// invocations fan out in parallel inside this single task and are all
/// joined before it completes; per-project outcomes are logged.
///
/// # Errors
///
/// Returns [`AppError::ScratchDir`] when the session is disabled.
pub async fn stop_all(ctx: &mut QueueContext) -> Result<()> {
    ctx.session.ensure_enabled()?;
    ctx.session.clear();
    let projects = ctx.containers.running_projects();
    if projects.is_empty() {
        ctx.log.append("No running projects to stop");
        return Ok(());
    }
    ctx.log
        .append(&format!("Stopping {} running project(s)", projects.len()));
    let downs = projects.into_iter().map(|project| {
        let engine = ctx.engine.clone();
        async move {
            let result = engine.down(&project).await;
            (project, result)
        }
    });
    for (project, result) in join_all(downs).await {
        match result {
            Ok(0) => ctx.log.append(&format!("Stopped project {project}")),
            Ok(code) => ctx
                .log
                .append(&format!("Stopping {project} exited with code {code}")),
            Err(err) => ctx
                .log
                .append(&format!("ERROR: Failed to stop {project}: {err}")),
        }
    }
    refresh_after(ctx).await;
    Ok(())
}

/// Queue task: initial container sync plus one-time external detection.
/// When the session is idle and a project is already running, the first
/// running project label (sorted order) is adopted as the active session.
///
/// # Errors
///
/// Propagates engine listing failures from the initial sync.
pub async fn bootstrap_sync(ctx: &mut QueueContext) -> Result<()> {
    reconcile::sync_task(ctx).await?;
    if ctx.session.active_project().is_none() {
        if let Some(project) = ctx.containers.running_projects().into_iter().next() {
            ctx.log
                .append(&format!("Detected externally started project: {project}"));
            ctx.session.activate(project);
        }
    }
    Ok(())
}

async fn refresh_after(ctx: &mut QueueContext) {
    if let Err(err) = reconcile::sync_task(ctx).await {
        warn!(%err, "container refresh after lifecycle operation failed");
    }
}
