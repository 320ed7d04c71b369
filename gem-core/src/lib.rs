pub mod health;
pub mod log_tail;
pub mod mailbox;
pub mod popup;
pub mod settings;
pub mod task;

use thiserror::Error;

pub use health::{
    HEALTH_CHECK_INTERVAL, HealthCheck, HealthPhase, HealthTransition, MAX_HEALTH_ATTEMPTS,
};
pub use log_tail::LogTail;
pub use mailbox::{ManualSummaryResponse, Suggestion, SuggestionAction, SummaryReady, UserResponse};
pub use popup::{
    Anchor, Countdown, Decision, DecisionSource, Point, Popup, PopupKind, PopupOutcome,
    PopupPhase, ScreenRect, Size,
};
pub use settings::{MailMethod, Settings};
pub use task::{PeriodicTask, TaskToken};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown mail method {0:?}")]
    UnknownMailMethod(String),
    #[error("malformed settings document: {0}")]
    MalformedSettings(#[source] serde_json::Error),
    #[error("malformed suggestion: {0}")]
    MalformedSuggestion(#[source] serde_json::Error),
    #[error("malformed summary notice: {0}")]
    MalformedSummaryReady(#[source] serde_json::Error),
    #[error("suggestion action must not be empty")]
    EmptySuggestionAction,
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub(crate) fn encode_pretty<T: serde::Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value).map_err(|err| CoreError::Serialization(err.to_string()))
}
