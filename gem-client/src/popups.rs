//! Registry of open popups and the owner's reaction to their outcomes.
//!
//! Popups live in creation order. Each takes the lowest free stack slot at its
//! anchor, so concurrent popups stack upwards instead of overlapping.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use gem_core::{
    Decision, DecisionSource, ManualSummaryResponse, Popup, PopupKind, PopupOutcome, ScreenRect,
    Suggestion, UserResponse,
};
use tracing::{info, warn};

use crate::{
    mailbox::{write_manual_summary, write_user_response},
    paths::GemPaths,
    watcher::MailboxEvent,
};

pub type PopupId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupContent {
    Suggestion(Suggestion),
    ManualSummary { draft: String },
    SummaryReady { path: PathBuf },
}

impl PopupContent {
    pub fn kind(&self) -> PopupKind {
        match self {
            PopupContent::Suggestion(_) => PopupKind::Suggestion,
            PopupContent::ManualSummary { .. } => PopupKind::ManualSummary,
            PopupContent::SummaryReady { .. } => PopupKind::SummaryReady,
        }
    }
}

/// Side effects the UI has to carry out after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEffect {
    OpenFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ActivePopup {
    id: PopupId,
    slot: usize,
    popup: Popup,
    content: PopupContent,
}

impl ActivePopup {
    pub fn id(&self) -> PopupId {
        self.id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn popup(&self) -> &Popup {
        &self.popup
    }

    pub fn content(&self) -> &PopupContent {
        &self.content
    }
}

#[derive(Debug)]
pub struct PopupManager {
    screen: ScreenRect,
    suggestion_timeout: Option<Duration>,
    user_response_file: PathBuf,
    manual_summary_file: PathBuf,
    next_id: PopupId,
    popups: Vec<ActivePopup>,
}

impl PopupManager {
    pub fn new(paths: &GemPaths, suggestion_timeout: Option<Duration>) -> Self {
        Self {
            screen: ScreenRect::default(),
            suggestion_timeout,
            user_response_file: paths.user_response_file(),
            manual_summary_file: paths.manual_summary_file(),
            next_id: 1,
            popups: Vec::new(),
        }
    }

    /// Applies to popups opened from now on.
    pub fn set_screen(&mut self, screen: ScreenRect) {
        self.screen = screen;
    }

    pub fn open(&mut self, content: PopupContent, now: Instant) -> PopupId {
        let kind = content.kind();
        let slot = self.free_slot(kind);
        let countdown = match kind {
            PopupKind::Suggestion => self.suggestion_timeout,
            PopupKind::ManualSummary | PopupKind::SummaryReady => kind.default_countdown(),
        };

        let id = self.next_id;
        self.next_id += 1;
        self.popups.push(ActivePopup {
            id,
            slot,
            popup: Popup::with_countdown(kind, self.screen, slot, now, countdown),
            content,
        });
        info!(id, ?kind, slot, "popup opened");
        id
    }

    pub fn open_suggestion(&mut self, suggestion: Suggestion, now: Instant) -> PopupId {
        self.open(PopupContent::Suggestion(suggestion), now)
    }

    pub fn handle_mailbox(&mut self, event: MailboxEvent, now: Instant) -> PopupId {
        match event {
            MailboxEvent::Suggestion(suggestion) => self.open_suggestion(suggestion, now),
            MailboxEvent::SummaryReady(ready) => self.open(
                PopupContent::SummaryReady {
                    path: PathBuf::from(ready.path),
                },
                now,
            ),
        }
    }

    pub fn accept(&mut self, id: PopupId) -> bool {
        self.get_mut(id).is_some_and(|active| active.popup.accept())
    }

    pub fn reject(&mut self, id: PopupId) -> bool {
        self.get_mut(id).is_some_and(|active| active.popup.reject())
    }

    /// Text buffer of a manual-summary dialog.
    pub fn draft_mut(&mut self, id: PopupId) -> Option<&mut String> {
        match &mut self.get_mut(id)?.content {
            PopupContent::ManualSummary { draft } => Some(draft),
            _ => None,
        }
    }

    /// Fires due auto-dismisses, reacts to every decided popup and drops the
    /// closed ones.
    pub fn tick(&mut self, now: Instant) -> Vec<PopupEffect> {
        let mut effects = Vec::new();
        let mut follow_ups = Vec::new();

        for active in &mut self.popups {
            active.popup.tick(now);
            let Some(decision) = active.popup.take_decision() else {
                continue;
            };
            info!(
                id = active.id,
                kind = ?active.content.kind(),
                outcome = ?decision.outcome,
                source = ?decision.source,
                "popup closed"
            );
            react(
                &self.user_response_file,
                &self.manual_summary_file,
                &active.content,
                decision,
                &mut effects,
                &mut follow_ups,
            );
        }

        self.popups.retain(|active| !active.popup.is_closed());
        for content in follow_ups {
            self.open(content, now);
        }
        effects
    }

    pub fn get(&self, id: PopupId) -> Option<&ActivePopup> {
        self.popups.iter().find(|active| active.id == id)
    }

    pub fn get_mut(&mut self, id: PopupId) -> Option<&mut ActivePopup> {
        self.popups.iter_mut().find(|active| active.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivePopup> {
        self.popups.iter()
    }

    pub fn len(&self) -> usize {
        self.popups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.popups.is_empty()
    }

    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.popups
            .iter()
            .filter_map(|active| active.popup.next_wakeup(now))
            .min()
    }

    fn free_slot(&self, kind: PopupKind) -> usize {
        let anchor = kind.anchor();
        let taken: Vec<usize> = self
            .popups
            .iter()
            .filter(|active| !active.popup.is_closed() && active.content.kind().anchor() == anchor)
            .map(|active| active.slot)
            .collect();
        (0..).find(|slot| !taken.contains(slot)).unwrap_or(0)
    }
}

fn react(
    user_response_file: &std::path::Path,
    manual_summary_file: &std::path::Path,
    content: &PopupContent,
    decision: Decision,
    effects: &mut Vec<PopupEffect>,
    follow_ups: &mut Vec<PopupContent>,
) {
    let accepted = decision.outcome == PopupOutcome::Accepted;
    match content {
        PopupContent::Suggestion(suggestion) => {
            let response = if accepted {
                UserResponse::accepted()
            } else {
                UserResponse::rejected()
            };
            respond(user_response_file, &response);
            if accepted && suggestion.action.wants_manual_summary() {
                follow_ups.push(PopupContent::ManualSummary {
                    draft: String::new(),
                });
            }
        }
        PopupContent::ManualSummary { draft } => {
            let summary = if accepted {
                ManualSummaryResponse::entered(draft.clone())
            } else {
                ManualSummaryResponse::declined()
            };
            if let Err(err) = write_manual_summary(manual_summary_file, &summary) {
                warn!("manual summary not written: {err}");
            }
            // The backend treats the suggestion as accepted whatever the dialog says.
            respond(user_response_file, &UserResponse::accepted());
        }
        PopupContent::SummaryReady { path } => {
            if accepted {
                effects.push(PopupEffect::OpenFile(path.clone()));
            } else if decision.source == DecisionSource::Timeout {
                info!(path = %path.display(), "summary notice expired");
            }
        }
    }
}

fn respond(path: &std::path::Path, response: &UserResponse) {
    if let Err(err) = write_user_response(path, response) {
        warn!("user response not written: {err}");
    }
}
