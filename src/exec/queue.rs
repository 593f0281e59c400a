//! Strictly-ordered asynchronous command execution.
//!
//! Every operation that touches session state or spawns a mutating external
//! process is submitted here. One dedicated worker task drains submissions
//! in order, one at a time; the worker exclusively owns the
//! [`QueueContext`] and with it the only mutable
//! [`ComposeSession`](crate::session::ComposeSession). A failing task is
//! reported and the queue moves on.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::activity::ActivityLog;
use crate::catalog::ManifestCatalog;
use crate::config::Config;
use crate::engine::ComposeEngine;
use crate::events::{UiEvent, UiSink};
use crate::fetch::ArtifactFetcher;
use crate::reconcile::ContainerView;
use crate::session::ComposeSession;
use crate::Result;

/// A unit of queued work with exclusive access to the worker context.
pub type QueueTask =
    Box<dyn for<'a> FnOnce(&'a mut QueueContext) -> BoxFuture<'a, Result<()>> + Send>;

/// State and services owned exclusively by the queue worker.
pub struct QueueContext {
    /// The single mutable compose session.
    pub session: ComposeSession,
    /// Engine invocation surface.
    pub engine: ComposeEngine,
    /// Remote single-file retrieval.
    pub fetcher: ArtifactFetcher,
    /// Manifest catalog state.
    pub catalog: Arc<ManifestCatalog>,
    /// Live container view shared with the reconciler.
    pub containers: Arc<ContainerView>,
    /// Activity log.
    pub log: Arc<ActivityLog>,
    /// Event channel to the presentation layer.
    pub ui: UiSink,
    /// Launcher configuration.
    pub config: Arc<Config>,
}

struct Submission {
    label: &'static str,
    task: QueueTask,
}

/// Cloneable submission handle; [`CommandQueue::submit`] never blocks.
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<Submission>,
}

/// Ownership handle for the worker task, consumed at shutdown.
pub struct QueueRuntime {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl CommandQueue {
    /// Spawn the worker that takes exclusive ownership of `ctx` and starts
    /// draining submissions in order.
    #[must_use]
    pub fn start(ctx: QueueContext) -> (Self, QueueRuntime) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker(ctx, rx, cancel.clone()));
        (Self { tx }, QueueRuntime { handle, cancel })
    }

    /// Append a unit of work; returns immediately. Submissions sent after
    /// shutdown are dropped with a warning.
    pub fn submit(&self, label: &'static str, task: QueueTask) {
        if self.tx.send(Submission { label, task }).is_err() {
            warn!(label, "command queue is shut down; submission dropped");
        }
    }
}

async fn worker(
    mut ctx: QueueContext,
    mut rx: mpsc::UnboundedReceiver<Submission>,
    cancel: CancellationToken,
) {
    loop {
        let submission = tokio::select! {
            () = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(submission) => submission,
                None => break,
            },
        };
        ctx.ui.send(UiEvent::Busy(true));
        debug!(label = submission.label, "queued task started");
        match (submission.task)(&mut ctx).await {
            Ok(()) => debug!(label = submission.label, "queued task finished"),
            Err(err) => {
                // Task boundary: report and keep the queue alive.
                error!(label = submission.label, %err, "queued task failed");
                ctx.log.append(&format!("ERROR: {err}"));
                ctx.ui.send(UiEvent::Error(err.to_string()));
            }
        }
        ctx.ui.send(UiEvent::Busy(false));
    }
    info!("command queue worker stopped");
}

impl QueueRuntime {
    /// Stop picking up submissions, wait up to `grace` for the in-flight
    /// task to finish, then abort the worker.
    pub async fn shutdown(mut self, grace: Duration) {
        self.cancel.cancel();
        if tokio::time::timeout(grace, &mut self.handle).await.is_err() {
            warn!("in-flight task exceeded shutdown grace; aborting queue worker");
            self.handle.abort();
        }
    }
}
