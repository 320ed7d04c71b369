//! Messages exchanged with the backend through mailbox files.
//!
//! Each path has exactly one writer and one reader: the backend writes
//! suggestions and summary notices, the shell writes user and manual-summary
//! responses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, encode_pretty};

pub const ACTION_SEND_MAIL: &str = "send_mail";
pub const ACTION_SUMMARISE_PDF: &str = "summarise_pdf";
pub const ACTION_SCHEDULE_MEETING: &str = "schedule_meeting";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SuggestionAction {
    SendMail,
    SummarisePdf,
    ScheduleMeeting,
    Unknown(String),
}

impl SuggestionAction {
    pub fn from_wire(action: &str) -> Self {
        match action.trim() {
            ACTION_SEND_MAIL => SuggestionAction::SendMail,
            ACTION_SUMMARISE_PDF => SuggestionAction::SummarisePdf,
            ACTION_SCHEDULE_MEETING => SuggestionAction::ScheduleMeeting,
            other => SuggestionAction::Unknown(other.to_owned()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            SuggestionAction::SendMail => ACTION_SEND_MAIL,
            SuggestionAction::SummarisePdf => ACTION_SUMMARISE_PDF,
            SuggestionAction::ScheduleMeeting => ACTION_SCHEDULE_MEETING,
            SuggestionAction::Unknown(other) => other,
        }
    }

    /// Accepting this action asks the user for the text to summarise.
    pub fn wants_manual_summary(&self) -> bool {
        matches!(self, SuggestionAction::SummarisePdf)
    }
}

impl fmt::Display for SuggestionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuggestionWire {
    action: String,
    reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub action: SuggestionAction,
    pub reason: String,
}

impl Suggestion {
    /// Parses `latest_suggestion.json`. Extra fields such as `trigger_data`
    /// are ignored.
    pub fn parse(data: &str) -> Result<Self, CoreError> {
        let wire: SuggestionWire =
            serde_json::from_str(data).map_err(CoreError::MalformedSuggestion)?;
        if wire.action.trim().is_empty() {
            return Err(CoreError::EmptySuggestionAction);
        }
        Ok(Self {
            action: SuggestionAction::from_wire(&wire.action),
            reason: wire.reason,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        encode_pretty(&SuggestionWire {
            action: self.action.as_wire().to_owned(),
            reason: self.reason.clone(),
        })
    }

    pub fn message(&self) -> String {
        format!("Suggested Action: {}\n\nReason: {}", self.action, self.reason)
    }
}

/// Notice that a generated summary is available on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryReady {
    pub path: String,
}

impl SummaryReady {
    pub fn parse(data: &str) -> Result<Self, CoreError> {
        serde_json::from_str(data).map_err(CoreError::MalformedSummaryReady)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl UserResponse {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            text: None,
        }
    }

    pub fn rejected() -> Self {
        Self {
            accepted: false,
            text: None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        encode_pretty(self)
    }
}

/// Reply to the manual-summary dialog. `text` is only present when the user
/// confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualSummaryResponse {
    pub manual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ManualSummaryResponse {
    pub fn entered(text: impl Into<String>) -> Self {
        Self {
            manual: true,
            text: Some(text.into()),
        }
    }

    pub fn declined() -> Self {
        Self {
            manual: false,
            text: None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        encode_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suggestion_and_formats_message() {
        let suggestion =
            Suggestion::parse(r#"{"action":"summarise_pdf","reason":"large document"}"#).unwrap();
        assert_eq!(suggestion.action, SuggestionAction::SummarisePdf);
        let message = suggestion.message();
        assert!(message.contains("summarise_pdf"));
        assert!(message.contains("large document"));
        assert_eq!(
            message,
            "Suggested Action: summarise_pdf\n\nReason: large document"
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let suggestion = Suggestion::parse(
            r#"{"action":"send_mail","reason":"reply needed","trigger_data":{"text":"hi"}}"#,
        )
        .unwrap();
        assert_eq!(suggestion.action, SuggestionAction::SendMail);
    }

    #[test]
    fn unknown_action_falls_through() {
        let suggestion = Suggestion::parse(r#"{"action":"order_pizza","reason":"lunch"}"#).unwrap();
        assert_eq!(
            suggestion.action,
            SuggestionAction::Unknown("order_pizza".into())
        );
        assert!(!suggestion.action.wants_manual_summary());
        assert_eq!(suggestion.action.to_string(), "order_pizza");
    }

    #[test]
    fn malformed_and_empty_suggestions_are_rejected() {
        assert!(matches!(
            Suggestion::parse("{ not json"),
            Err(CoreError::MalformedSuggestion(_))
        ));
        assert!(matches!(
            Suggestion::parse("{}"),
            Err(CoreError::MalformedSuggestion(_))
        ));
        assert!(matches!(
            Suggestion::parse(r#"{"action":"  ","reason":"x"}"#),
            Err(CoreError::EmptySuggestionAction)
        ));
    }

    #[test]
    fn responses_omit_absent_text() {
        let json = UserResponse::rejected().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "accepted": false }));

        let json = ManualSummaryResponse::declined().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "manual": false }));
    }

    #[test]
    fn manual_summary_text_is_escaped() {
        let json = ManualSummaryResponse::entered("say \"hi\"\nthen leave")
            .to_json_pretty()
            .unwrap();
        let back: ManualSummaryResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text.as_deref(), Some("say \"hi\"\nthen leave"));
        assert!(back.manual);
    }
}
