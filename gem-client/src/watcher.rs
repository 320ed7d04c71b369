use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use gem_core::{PeriodicTask, Suggestion, SummaryReady};
use tracing::{debug, info, warn};

use crate::{
    mailbox::{MailboxError, take_json},
    paths::GemPaths,
};

pub const SUGGESTION_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxEvent {
    Suggestion(Suggestion),
    SummaryReady(SummaryReady),
}

/// Polls the backend's outgoing mailbox files.
#[derive(Debug, Clone)]
pub struct SuggestionWatcher {
    suggestion_file: PathBuf,
    summary_ready_file: PathBuf,
    task: PeriodicTask,
}

impl SuggestionWatcher {
    pub fn new(paths: &GemPaths, now: Instant) -> Self {
        Self::with_interval(paths, SUGGESTION_POLL_INTERVAL, now)
    }

    pub fn with_interval(paths: &GemPaths, interval: Duration, now: Instant) -> Self {
        Self {
            suggestion_file: paths.suggestion_file(),
            summary_ready_file: paths.summary_ready_file(),
            task: PeriodicTask::started(interval, now),
        }
    }

    /// Checks the mailbox when a tick is due.
    pub fn poll(&mut self, now: Instant) -> Vec<MailboxEvent> {
        if !self.task.poll(now) {
            return Vec::new();
        }
        self.check_now()
    }

    /// One immediate pass over both mailbox files.
    pub fn check_now(&self) -> Vec<MailboxEvent> {
        let mut events = Vec::new();

        if let Some(suggestion) = take_logged(&self.suggestion_file, Suggestion::parse) {
            info!(action = %suggestion.action, "suggestion received");
            events.push(MailboxEvent::Suggestion(suggestion));
        }
        if let Some(ready) = take_logged(&self.summary_ready_file, SummaryReady::parse) {
            info!(path = %ready.path, "summary ready");
            events.push(MailboxEvent::SummaryReady(ready));
        }
        events
    }

    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.task.until_due(now)
    }
}

fn take_logged<T>(
    path: &std::path::Path,
    parse: impl FnOnce(&str) -> Result<T, gem_core::CoreError>,
) -> Option<T> {
    match take_json(path, parse) {
        Ok(value) => value,
        // The backend may still be writing; retried next tick.
        Err(err @ MailboxError::Parse { .. }) => {
            debug!("{err}");
            None
        }
        Err(err) => {
            warn!("{err}");
            None
        }
    }
}
