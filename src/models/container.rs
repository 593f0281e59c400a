//! Live container records polled from the engine.

/// Classification of an engine status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Status begins with `Up`.
    Running,
    /// Status begins with `Exited`.
    Stopped,
    /// Anything else (`Created`, `Restarting`, `Paused`, ...).
    Other,
}

/// Classify a raw engine status string.
#[must_use]
pub fn classify_status(status: &str) -> ContainerState {
    if status.starts_with("Up") {
        ContainerState::Running
    } else if status.starts_with("Exited") {
        ContainerState::Stopped
    } else {
        ContainerState::Other
    }
}

/// One container as reported by a single engine poll.
///
/// Records are produced fresh on every poll cycle and replaced wholesale;
/// the container name is the identity within one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Container name.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Raw engine status text, e.g. `Up 2 minutes`.
    pub status: String,
    /// Compose project label the container belongs to; empty when the
    /// container was not started through the compose frontend.
    pub project: String,
    /// How long the container has been running, when reported.
    pub uptime: Option<String>,
}

impl ContainerRecord {
    /// Parse one pipe-delimited engine output line of the form
    /// `name|image|status|project` with an optional fifth uptime field.
    ///
    /// Lines with fewer than four fields are not records and yield `None`.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 4 {
            return None;
        }
        let uptime = fields
            .get(4)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_owned);
        Some(Self {
            name: fields[0].trim().to_owned(),
            image: fields[1].trim().to_owned(),
            status: fields[2].trim().to_owned(),
            project: fields[3].trim().to_owned(),
            uptime,
        })
    }

    /// Whether the status text classifies as running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        classify_status(&self.status) == ContainerState::Running
    }
}
