//! Single-file retrieval from a remote branch head.
//!
//! The manifest and every compose template are read through an ephemeral,
//! depth-limited checkout: a throwaway repository is initialized in a
//! uniquely-named scratch directory, the branch head is fetched with
//! `--depth 1`, and the one file is read from the remote-tracking ref
//! without ever materializing a working tree. The scratch directory is
//! removed on success and failure alike.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::activity::ActivityLog;
use crate::config::{Config, RemoteConfig};
use crate::exec::{CommandSpec, ProcessRunner};
use crate::{AppError, Result};

/// Retrieves the content of single files at the configured branch head.
pub struct ArtifactFetcher {
    remote: RemoteConfig,
    scratch_root: PathBuf,
    runner: ProcessRunner,
    log: Arc<ActivityLog>,
}

impl ArtifactFetcher {
    /// Construct a fetcher for the configured remote. Ephemeral checkout
    /// directories are created under the configured scratch root, falling
    /// back to the system temp directory.
    #[must_use]
    pub fn new(config: &Config, runner: ProcessRunner, log: Arc<ActivityLog>) -> Self {
        Self {
            remote: config.remote.clone(),
            scratch_root: config.scratch_root(),
            runner,
            log,
        }
    }

    /// Fetch the content of `path` at the configured branch head.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ScratchDir`] when the ephemeral directory cannot
    /// be created and [`AppError::Fetch`] when any retrieval step fails.
    /// Never returns partial content.
    pub async fn fetch_file(&self, path: &str) -> Result<String> {
        let dir = tempfile::Builder::new()
            .prefix("compose-pilot-fetch-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| {
                AppError::ScratchDir(format!("cannot create ephemeral fetch directory: {e}"))
            })?;
        debug!(dir = %dir.path().display(), path, "fetching file from remote");

        let result = self.fetch_in(dir.path(), path).await;

        // Removed on success and failure alike; a failed removal is logged,
        // never propagated.
        if let Err(e) = dir.close() {
            warn!("failed to remove ephemeral fetch directory: {e}");
            self.log
                .append(&format!("Failed to remove ephemeral fetch directory: {e}"));
        }
        result
    }

    async fn fetch_in(&self, dir: &Path, path: &str) -> Result<String> {
        self.run_step(dir, &["init"], "git init failed").await?;
        self.run_step(
            dir,
            &["remote", "add", "origin", self.remote.repo_url.as_str()],
            "git remote add failed",
        )
        .await?;
        self.run_step(
            dir,
            &["fetch", "--depth", "1", "origin", self.remote.branch.as_str()],
            "git fetch failed",
        )
        .await?;

        // The fetch only updates the remote-tracking ref, so the blob is
        // addressed as origin/<branch>:<path>.
        let target = format!("origin/{}:{}", self.remote.branch, path);
        let spec = CommandSpec::new(["git", "show", target.as_str()]).current_dir(dir);
        let output = self.runner.run_captured(&spec).await?;
        if !output.success() {
            return Err(AppError::Fetch(format!(
                "git show {target} failed with code {}: {}",
                output.code,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    async fn run_step(&self, dir: &Path, args: &[&str], step_name: &str) -> Result<()> {
        let mut argv = vec!["git"];
        argv.extend_from_slice(args);
        self.log.append(&argv.join(" "));
        let spec = CommandSpec::new(argv).current_dir(dir);
        let output = self.runner.run_captured(&spec).await?;
        if output.success() {
            Ok(())
        } else {
            let detail = output.merged();
            self.log.append(&format!("{step_name}: {detail}"));
            Err(AppError::Fetch(format!(
                "{step_name} with code {}: {detail}",
                output.code
            )))
        }
    }
}
