//! Timestamped activity log with daily file rotation.

use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{Local, NaiveDate};
use tracing::warn;

use crate::events::{UiEvent, UiSink};
use crate::{AppError, Result};

/// Internal file state protected by a mutex.
struct WriterState {
    current_date: NaiveDate,
    writer: BufWriter<fs::File>,
}

/// Append-only activity log feeding the UI and an optional daily file.
///
/// Every appended message is stamped `HH:MM:SS - message` in local time,
/// published as [`UiEvent::Log`], and appended to
/// `<log_dir>/activity-YYYY-MM-DD.log` when a log directory is configured.
/// A new file is opened when the calendar date changes between writes.
/// File-write failures degrade to `tracing::warn!` and never fail the
/// calling operation.
pub struct ActivityLog {
    ui: UiSink,
    log_dir: Option<PathBuf>,
    state: Mutex<Option<WriterState>>,
}

impl ActivityLog {
    /// Construct a log that publishes on `ui` and, when `log_dir` is set,
    /// appends to daily files beneath it.
    ///
    /// Creates `log_dir` and all parent directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Config`] if the directory cannot be
    /// created.
    pub fn new(ui: UiSink, log_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &log_dir {
            fs::create_dir_all(dir).map_err(|e| {
                AppError::Config(format!(
                    "failed to create activity log directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(Self {
            ui,
            log_dir,
            state: Mutex::new(None),
        })
    }

    /// Stamp and publish one message, appending it to the daily file when
    /// file logging is enabled.
    pub fn append(&self, message: &str) {
        let stamped = format!("{} - {message}", Local::now().format("%H:%M:%S"));
        self.ui.send(UiEvent::Log(stamped.clone()));
        if self.log_dir.is_some() {
            self.write_line(&stamped);
        }
    }

    fn write_line(&self, line: &str) {
        let today = Local::now().date_naive();

        let Ok(mut guard) = self.state.lock() else {
            warn!("activity log mutex poisoned; dropping line");
            return;
        };

        let needs_rotation = guard.as_ref().is_none_or(|s| s.current_date != today);

        if needs_rotation {
            let dir = match &self.log_dir {
                Some(dir) => dir,
                None => return,
            };
            match Self::open_for_date(dir, today) {
                Ok(writer) => {
                    *guard = Some(WriterState {
                        current_date: today,
                        writer,
                    });
                }
                Err(e) => {
                    warn!("failed to open activity log file: {e}");
                    return;
                }
            }
        }

        if let Some(state) = guard.as_mut() {
            if let Err(e) = writeln!(state.writer, "{line}") {
                warn!("failed to write activity log line: {e}");
                return;
            }
            if let Err(e) = state.writer.flush() {
                warn!("failed to flush activity log: {e}");
            }
        }
    }

    fn open_for_date(log_dir: &Path, date: NaiveDate) -> std::io::Result<BufWriter<fs::File>> {
        let file_name = format!("activity-{date}.log");
        let path = log_dir.join(file_name);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }
}
