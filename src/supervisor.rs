//! Service graph construction and user-facing operations.
//!
//! The supervisor wires configuration, activity log, runner, engine,
//! fetcher, catalog, container view, queue, and reconciler together, runs
//! the startup bootstrap, and exposes every user-facing operation as a
//! queue submission or a snapshot read. It is the headless seam a frontend
//! attaches to: operations in, [`UiEvent`]s out.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::activity::ActivityLog;
use crate::catalog::{self, ManifestCatalog};
use crate::config::Config;
use crate::engine::ComposeEngine;
use crate::events::{UiEvent, UiSink};
use crate::exec::{CommandQueue, ProcessRunner, QueueContext, QueueRuntime};
use crate::fetch::ArtifactFetcher;
use crate::models::{CompositionVersion, ContainerRecord};
use crate::reconcile::{ContainerView, Reconciler};
use crate::session::{self, ComposeSession};
use crate::{AppError, Result};

/// Owns the running service graph.
pub struct Supervisor {
    queue: CommandQueue,
    queue_runtime: QueueRuntime,
    reconciler: Reconciler,
    catalog: Arc<ManifestCatalog>,
    containers: Arc<ContainerView>,
    log: Arc<ActivityLog>,
    ui: UiSink,
    config: Arc<Config>,
}

impl Supervisor {
    /// Build the service graph, start the queue worker and the poll loop,
    /// and enqueue the startup bootstrap. Returns the supervisor together
    /// with the UI event stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the activity log directory cannot
    /// be created.
    pub fn start(config: Config) -> Result<(Self, UnboundedReceiver<UiEvent>)> {
        let config = Arc::new(config);
        let (ui, events) = UiSink::channel();
        let log = Arc::new(ActivityLog::new(ui.clone(), config.log_dir.clone())?);
        let runner = ProcessRunner::new(Arc::clone(&log));
        let engine = ComposeEngine::new(&config, runner.clone());
        let fetcher = ArtifactFetcher::new(&config, runner, Arc::clone(&log));
        let catalog = Arc::new(ManifestCatalog::new());
        let containers = Arc::new(ContainerView::new());

        let session = ComposeSession::new(&config.scratch_root());
        if let Some(reason) = session.disabled_reason() {
            log.append(&format!(
                "ERROR: Failed to create session working directory: {reason}"
            ));
            ui.error(format!("Start and stop are disabled: {reason}"));
        }

        let ctx = QueueContext {
            session,
            engine: engine.clone(),
            fetcher,
            catalog: Arc::clone(&catalog),
            containers: Arc::clone(&containers),
            log: Arc::clone(&log),
            ui: ui.clone(),
            config: Arc::clone(&config),
        };
        let (queue, queue_runtime) = CommandQueue::start(ctx);
        let reconciler = Reconciler::spawn(
            engine,
            Arc::clone(&containers),
            ui.clone(),
            Arc::clone(&log),
            config.poll_interval(),
        );

        let supervisor = Self {
            queue,
            queue_runtime,
            reconciler,
            catalog,
            containers,
            log,
            ui,
            config,
        };
        supervisor.bootstrap();
        Ok((supervisor, events))
    }

    /// Startup sequence: engine discovery, initial container sync with
    /// one-time external detection, initial manifest refresh. All queued,
    /// so they run in order before any user-submitted operation.
    fn bootstrap(&self) {
        self.queue
            .submit("discover-engine", Box::new(|ctx| Box::pin(discover_engine(ctx))));
        self.queue.submit(
            "initial-sync",
            Box::new(|ctx| Box::pin(session::bootstrap_sync(ctx))),
        );
        self.queue
            .submit("refresh-catalog", Box::new(|ctx| Box::pin(catalog::refresh(ctx))));
    }

    /// Enqueue a manifest refresh.
    pub fn refresh_catalog(&self) {
        self.queue
            .submit("refresh-catalog", Box::new(|ctx| Box::pin(catalog::refresh(ctx))));
    }

    /// Record the pair selection for a subsequent start.
    pub fn select_pair(&self, pair: Option<CompositionVersion>) {
        self.catalog.select(pair);
    }

    /// The currently selected pair, if any.
    #[must_use]
    pub fn selected_pair(&self) -> Option<CompositionVersion> {
        self.catalog.selected()
    }

    /// Record the container selected in the presentation layer.
    pub fn select_container(&self, name: Option<String>) {
        self.containers.select(name);
    }

    /// Enqueue a start of the currently selected pair. Without a selection
    /// this reports [`AppError::SelectionMissing`] and touches nothing.
    pub fn start_selected(&self) {
        let Some(pair) = self.catalog.selected() else {
            let err = AppError::SelectionMissing(
                "select a composition and version before starting".to_owned(),
            );
            self.log.append(&format!("ERROR: {err}"));
            self.ui.error(err.to_string());
            return;
        };
        self.queue
            .submit("start", Box::new(move |ctx| Box::pin(session::start(ctx, pair))));
    }

    /// Enqueue a stop of the active project.
    pub fn stop(&self) {
        self.queue
            .submit("stop", Box::new(|ctx| Box::pin(session::stop(ctx))));
    }

    /// Enqueue a stop of every project observed as running.
    pub fn stop_all(&self) {
        self.queue
            .submit("stop-all", Box::new(|ctx| Box::pin(session::stop_all(ctx))));
    }

    /// Request an immediate container poll.
    pub fn refresh_containers(&self) {
        self.reconciler.poke();
    }

    /// Snapshot of the most recent container poll.
    #[must_use]
    pub fn containers(&self) -> Vec<ContainerRecord> {
        self.containers.records()
    }

    /// Selectable pairs from the current manifest snapshot.
    #[must_use]
    pub fn pairs(&self) -> Vec<CompositionVersion> {
        self.catalog.pairs()
    }

    /// Stop the poll loop, then let the in-flight task finish within the
    /// configured grace period and shut the queue down.
    pub async fn shutdown(self) {
        info!("supervisor shutting down");
        self.reconciler.shutdown().await;
        self.queue_runtime
            .shutdown(self.config.shutdown_grace())
            .await;
    }
}

async fn discover_engine(ctx: &mut QueueContext) -> Result<()> {
    match ctx.engine.locate_binary().await {
        Some(path) => ctx.log.append(&format!("Container engine found at: {path}")),
        None => ctx.log.append(&format!(
            "Container engine '{}' not found on the search path; lifecycle commands will fail",
            ctx.engine.binary()
        )),
    }
    Ok(())
}
