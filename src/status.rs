//! Human-facing stack status derivation.
//!
//! Pure functions over the polled container list; no engine access, no
//! shared state. The reconciler calls [`summarize`] after every refresh and
//! publishes the result on the UI event channel.

use crate::models::ContainerRecord;

/// Overall classification of the polled container set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    /// No containers exist.
    Stopped,
    /// Every container is running.
    Running,
    /// Containers exist but not all of them are running.
    Partial,
}

/// Running and total counts with the offline remainder, derived from one
/// poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    /// Number of containers whose status classifies as running.
    pub running: usize,
    /// Total number of polled containers.
    pub total: usize,
    /// Overall classification.
    pub state: StackState,
    /// Containers not currently running, for diagnostic display.
    pub offline: Vec<ContainerRecord>,
}

impl StatusSummary {
    /// One-line headline for the presentation layer.
    #[must_use]
    pub fn headline(&self) -> String {
        if self.total == 0 {
            "Status: Stopped".to_owned()
        } else {
            format!("Status: {}/{} running", self.running, self.total)
        }
    }
}

/// Derive the status summary for the given container list.
#[must_use]
pub fn summarize(containers: &[ContainerRecord]) -> StatusSummary {
    let total = containers.len();
    let running = containers.iter().filter(|c| c.is_running()).count();
    let state = if total == 0 {
        StackState::Stopped
    } else if running == total {
        StackState::Running
    } else {
        StackState::Partial
    };
    let offline = containers
        .iter()
        .filter(|c| !c.is_running())
        .cloned()
        .collect();
    StatusSummary {
        running,
        total,
        state,
        offline,
    }
}
