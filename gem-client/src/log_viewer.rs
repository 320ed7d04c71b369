use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use gem_core::{LogTail, PeriodicTask};
use tracing::{info, warn};

pub const LOG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Append-only mirror of the backend's log file, refreshed while open.
#[derive(Debug, Clone)]
pub struct LogViewer {
    path: PathBuf,
    tail: LogTail,
    display: String,
    missing: bool,
    task: PeriodicTask,
}

impl LogViewer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_interval(path, LOG_POLL_INTERVAL)
    }

    pub fn with_interval(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            tail: LogTail::new(),
            display: String::new(),
            missing: false,
            task: PeriodicTask::new(interval),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.task.is_running()
    }

    /// Starts polling and loads the current content right away.
    pub fn open(&mut self, now: Instant) {
        self.task.start(now);
        self.refresh();
    }

    pub fn close(&mut self) {
        self.task.cancel();
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        self.task.poll(now) && self.refresh()
    }

    /// Reads the file and appends whatever is new. Returns `true` when the
    /// displayed text changed.
    pub fn refresh(&mut self) -> bool {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return self.show_missing(),
            Err(err) => {
                warn!(path = %self.path.display(), "log read failed: {err}");
                return false;
            }
        };

        let was_missing = std::mem::replace(&mut self.missing, false);
        if was_missing {
            self.display.clear();
        }

        let content = String::from_utf8_lossy(&bytes);
        match self.tail.observe(&content) {
            Some(delta) if !delta.is_empty() => {
                self.display.push_str(&delta);
                true
            }
            _ => was_missing,
        }
    }

    /// Truncates the file and forgets everything shown so far. A missing
    /// file is not created and the placeholder stays up.
    pub fn clear(&mut self) -> io::Result<()> {
        match OpenOptions::new().write(true).truncate(true).open(&self.path) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.missing = false;
                self.show_missing();
                return Ok(());
            }
            Err(err) => return Err(err),
        }
        info!(path = %self.path.display(), "log cleared");
        self.missing = false;
        self.display.clear();
        self.tail.clear();
        Ok(())
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_missing(&self) -> bool {
        self.missing
    }

    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.task.until_due(now)
    }

    fn show_missing(&mut self) -> bool {
        if self.missing {
            return false;
        }
        self.missing = true;
        self.tail.clear();
        self.display = format!("Log file not found: {}", self.path.display());
        true
    }
}
