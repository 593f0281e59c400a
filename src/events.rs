//! Outbound event channel for the presentation layer.
//!
//! The core never draws anything: every observable change is published as a
//! [`UiEvent`] on an unbounded channel and a frontend (the bundled terminal
//! renderer, or anything richer) consumes the stream. Senders never block
//! and tolerate a dropped receiver, so core progress is independent of the
//! consumer.

use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{CompositionVersion, ContainerRecord};
use crate::status::StatusSummary;

/// One observable change published by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Timestamped activity log line.
    Log(String),
    /// Error notice that aborted a user-requested action.
    Error(String),
    /// Wholesale replacement of the live container list, with the surviving
    /// selection (by container name), if any.
    Containers {
        /// The new container list.
        records: Vec<ContainerRecord>,
        /// Name of the still-selected container, when it survived.
        selected: Option<String>,
    },
    /// Fresh status summary derived from the latest poll.
    Status(StatusSummary),
    /// Regenerated composition/version pairings after a manifest refresh.
    Catalog(Vec<CompositionVersion>),
    /// Whether a queued task is currently executing; frontends disable
    /// their lifecycle controls while `true`.
    Busy(bool),
}

/// Cloneable sending half of the event channel.
#[derive(Debug, Clone)]
pub struct UiSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiSink {
    /// Create the channel, returning the sink and its receiving half.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event. A closed channel is tolerated: a frontend that has
    /// gone away must not stall the core.
    pub fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            debug!("ui event dropped: receiver closed");
        }
    }

    /// Publish an error notice.
    pub fn error(&self, message: impl Into<String>) {
        self.send(UiEvent::Error(message.into()));
    }
}
