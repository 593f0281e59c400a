//! Live container state reconciliation.
//!
//! A background loop polls the engine on a fixed interval and replaces the
//! shared [`ContainerView`] wholesale, preserving the selected container by
//! name when it survives the refresh. The derived set of running project
//! labels, not the session's remembered project, is the authoritative
//! "is anything running" signal, because it also sees compositions started
//! outside this tool. The loop only reads engine state; session mutations
//! stay on the command queue.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::activity::ActivityLog;
use crate::engine::ComposeEngine;
use crate::events::{UiEvent, UiSink};
use crate::exec::QueueContext;
use crate::models::ContainerRecord;
use crate::status;
use crate::Result;

#[derive(Default)]
struct ViewState {
    records: Vec<ContainerRecord>,
    selected: Option<String>,
}

/// Shared, lock-guarded view of the most recent container poll.
#[derive(Default)]
pub struct ContainerView {
    state: RwLock<ViewState>,
}

impl ContainerView {
    /// An empty view with no records and no selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view wholesale. The prior selection is preserved only
    /// when a record with the same name is present in `records`; otherwise
    /// it is dropped. Returns the stored records and surviving selection.
    pub fn apply(&self, records: Vec<ContainerRecord>) -> (Vec<ContainerRecord>, Option<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let selected = state
            .selected
            .take()
            .filter(|name| records.iter().any(|r| &r.name == name));
        state.selected.clone_from(&selected);
        state.records.clone_from(&records);
        (records, selected)
    }

    /// The records from the most recent poll.
    #[must_use]
    pub fn records(&self) -> Vec<ContainerRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Record the container selected in the presentation layer.
    pub fn select(&self, name: Option<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .selected = name;
    }

    /// Name of the currently selected container, if any.
    #[must_use]
    pub fn selected(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selected
            .clone()
    }

    /// Project labels with at least one running member container, sorted.
    /// Containers without a project label are skipped.
    #[must_use]
    pub fn running_projects(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let projects: BTreeSet<String> = state
            .records
            .iter()
            .filter(|r| r.is_running() && !r.project.is_empty())
            .map(|r| r.project.clone())
            .collect();
        projects.into_iter().collect()
    }
}

/// Poll the engine once, merge the result into `view`, and publish the new
/// list and derived status summary.
///
/// # Errors
///
/// Propagates engine listing failures; the view keeps its previous records.
pub async fn sync_once(engine: &ComposeEngine, view: &ContainerView, ui: &UiSink) -> Result<()> {
    let records = engine.list_containers().await?;
    let (records, selected) = view.apply(records);
    let summary = status::summarize(&records);
    ui.send(UiEvent::Containers { records, selected });
    ui.send(UiEvent::Status(summary));
    Ok(())
}

/// Queue task: on-demand container refresh after a lifecycle operation.
///
/// # Errors
///
/// Propagates engine listing failures.
pub async fn sync_task(ctx: &mut QueueContext) -> Result<()> {
    sync_once(&ctx.engine, &ctx.containers, &ctx.ui).await
}

/// Handle to the periodic poll loop.
pub struct Reconciler {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    poke: Arc<Notify>,
}

impl Reconciler {
    /// Spawn the poll loop. The first poll happens one full interval after
    /// startup; the initial refresh is driven through the queue instead.
    #[must_use]
    pub fn spawn(
        engine: ComposeEngine,
        view: Arc<ContainerView>,
        ui: UiSink,
        log: Arc<ActivityLog>,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let poke = Arc::new(Notify::new());
        let handle = tokio::spawn(poll_loop(
            engine,
            view,
            ui,
            log,
            interval,
            cancel.clone(),
            Arc::clone(&poke),
        ));
        Self {
            handle,
            cancel,
            poke,
        }
    }

    /// Request an immediate poll without waiting for the next tick.
    pub fn poke(&self) {
        self.poke.notify_one();
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            warn!(%err, "container reconciler did not exit cleanly");
        }
    }
}

async fn poll_loop(
    engine: ComposeEngine,
    view: Arc<ContainerView>,
    ui: UiSink,
    log: Arc<ActivityLog>,
    interval: Duration,
    cancel: CancellationToken,
    poke: Arc<Notify>,
) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            () = poke.notified() => {}
        }
        if let Err(err) = sync_once(&engine, &view, &ui).await {
            warn!(%err, "container poll failed");
            log.append(&format!("ERROR: Failed to refresh container list: {err}"));
        }
    }
    info!("container reconciler stopped");
}
