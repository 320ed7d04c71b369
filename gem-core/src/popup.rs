//! Transient popup lifecycle: slide-in, user decision, auto-dismiss.
//!
//! A [`Popup`] is pure state; the caller supplies the clock and renders it.
//! Accept and Reject are terminal and only the first decision counts.

use std::time::{Duration, Instant};

/// Gap between stacked popups sharing an anchor.
pub const STACK_GAP: f32 = 10.0;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

/// Usable area of the primary display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Height kept free at the bottom of the display for a taskbar or dock.
pub const TASKBAR_RESERVE: f32 = 48.0;

impl ScreenRect {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: width,
            bottom: height,
        }
    }

    /// Monitor of the given size with [`TASKBAR_RESERVE`] taken off the bottom
    /// edge. Used when only the monitor size is known and the real work area
    /// is not.
    pub fn work_area(width: f32, height: f32) -> Self {
        Self {
            bottom: (height - TASKBAR_RESERVE).max(0.0),
            ..Self::from_size(width, height)
        }
    }
}

/// A 1080p work area. The origin is always (0, 0): popups land on the primary
/// display, and a side or top taskbar is not accounted for.
impl Default for ScreenRect {
    fn default() -> Self {
        Self::work_area(1920.0, 1080.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    OutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopupKind {
    /// Backend suggestion, bottom-right.
    Suggestion,
    /// Text entry for a summary, bottom-left.
    ManualSummary,
    /// A finished summary can be opened, bottom-left.
    SummaryReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    BottomLeft,
    BottomRight,
}

impl PopupKind {
    pub fn size(self) -> Size {
        match self {
            PopupKind::Suggestion => Size { w: 340.0, h: 150.0 },
            PopupKind::ManualSummary => Size { w: 420.0, h: 240.0 },
            PopupKind::SummaryReady => Size { w: 320.0, h: 120.0 },
        }
    }

    pub fn anchor(self) -> Anchor {
        match self {
            PopupKind::Suggestion => Anchor::BottomRight,
            PopupKind::ManualSummary | PopupKind::SummaryReady => Anchor::BottomLeft,
        }
    }

    pub fn slide_duration(self) -> Duration {
        match self {
            PopupKind::Suggestion => Duration::from_millis(400),
            PopupKind::ManualSummary | PopupKind::SummaryReady => Duration::from_millis(300),
        }
    }

    pub fn easing(self) -> Easing {
        match self {
            PopupKind::Suggestion => Easing::OutCubic,
            PopupKind::ManualSummary | PopupKind::SummaryReady => Easing::Linear,
        }
    }

    pub fn default_countdown(self) -> Option<Duration> {
        match self {
            PopupKind::Suggestion => Some(Duration::from_secs(15)),
            PopupKind::ManualSummary | PopupKind::SummaryReady => Some(Duration::from_secs(10)),
        }
    }

    /// Start and rest positions for a popup in stack `slot` (0 = lowest).
    pub fn slide_path(self, screen: ScreenRect, slot: usize) -> (Point, Point) {
        let size = self.size();
        let lift = (size.h + STACK_GAP) * slot as f32;
        match self {
            PopupKind::Suggestion => {
                let y = screen.bottom - size.h - 20.0 - lift;
                (
                    Point {
                        x: screen.right + 10.0,
                        y,
                    },
                    Point {
                        x: screen.right - size.w - 20.0,
                        y,
                    },
                )
            }
            PopupKind::ManualSummary | PopupKind::SummaryReady => {
                let margin_bottom = if self == PopupKind::ManualSummary {
                    50.0
                } else {
                    30.0
                };
                let y = screen.bottom - size.h - margin_bottom - lift;
                (
                    Point {
                        x: screen.left - size.w,
                        y,
                    },
                    Point {
                        x: screen.left + 20.0,
                        y,
                    },
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    User,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub outcome: PopupOutcome,
    pub source: DecisionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupPhase {
    SlidingIn,
    Visible,
    AutoDismissing,
    /// Decided, waiting for the owner to collect the outcome.
    Deciding,
    Closed,
}

/// Single-shot countdown with a linearly shrinking indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started: Instant,
    duration: Duration,
}

impl Countdown {
    pub fn new(started: Instant, duration: Duration) -> Self {
        Self { started, duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration.saturating_sub(self.elapsed(now))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.duration
    }

    /// `max(0, 100 - 100 * elapsed / duration)`.
    pub fn remaining_percent(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        let ratio = self.elapsed(now).as_secs_f64() / self.duration.as_secs_f64();
        (100.0 - 100.0 * ratio).max(0.0) as f32
    }
}

#[derive(Debug, Clone)]
pub struct Popup {
    kind: PopupKind,
    opened_at: Instant,
    from: Point,
    to: Point,
    countdown: Option<Countdown>,
    decision: Option<Decision>,
    closed: bool,
}

impl Popup {
    /// Opens a popup with the kind's default countdown.
    pub fn open(kind: PopupKind, screen: ScreenRect, slot: usize, now: Instant) -> Self {
        Self::with_countdown(kind, screen, slot, now, kind.default_countdown())
    }

    pub fn with_countdown(
        kind: PopupKind,
        screen: ScreenRect,
        slot: usize,
        now: Instant,
        countdown: Option<Duration>,
    ) -> Self {
        let (from, to) = kind.slide_path(screen, slot);
        Self {
            kind,
            opened_at: now,
            from,
            to,
            countdown: countdown.map(|d| Countdown::new(now, d)),
            decision: None,
            closed: false,
        }
    }

    pub fn kind(&self) -> PopupKind {
        self.kind
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn rest_position(&self) -> Point {
        self.to
    }

    pub fn position(&self, now: Instant) -> Point {
        let slide = self.kind.slide_duration();
        let elapsed = now.saturating_duration_since(self.opened_at);
        if slide.is_zero() || elapsed >= slide {
            return self.to;
        }
        let t = self
            .kind
            .easing()
            .apply(elapsed.as_secs_f32() / slide.as_secs_f32());
        Point {
            x: self.from.x + (self.to.x - self.from.x) * t,
            y: self.from.y + (self.to.y - self.from.y) * t,
        }
    }

    pub fn is_sliding(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.opened_at) < self.kind.slide_duration()
    }

    pub fn phase(&self, now: Instant) -> PopupPhase {
        if self.closed {
            PopupPhase::Closed
        } else if self.decision.is_some() {
            PopupPhase::Deciding
        } else if self.is_sliding(now) {
            PopupPhase::SlidingIn
        } else if self.countdown.is_some() {
            PopupPhase::AutoDismissing
        } else {
            PopupPhase::Visible
        }
    }

    pub fn accept(&mut self) -> bool {
        self.decide(PopupOutcome::Accepted, DecisionSource::User)
    }

    pub fn reject(&mut self) -> bool {
        self.decide(PopupOutcome::Rejected, DecisionSource::User)
    }

    fn decide(&mut self, outcome: PopupOutcome, source: DecisionSource) -> bool {
        if self.closed || self.decision.is_some() {
            return false;
        }
        self.decision = Some(Decision { outcome, source });
        true
    }

    /// Fires the auto-dismiss when the countdown has run out.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.countdown {
            Some(countdown) if countdown.is_expired(now) => {
                self.decide(PopupOutcome::Rejected, DecisionSource::Timeout)
            }
            _ => false,
        }
    }

    /// Hands the decision to the owner and closes the popup.
    pub fn take_decision(&mut self) -> Option<Decision> {
        if self.closed {
            return None;
        }
        let decision = self.decision?;
        self.closed = true;
        Some(decision)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn remaining_percent(&self, now: Instant) -> Option<f32> {
        self.countdown.map(|c| c.remaining_percent(now))
    }

    /// How long the owner may sleep before this popup needs attention.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        if self.closed {
            return None;
        }
        if self.decision.is_some() {
            return Some(Duration::ZERO);
        }
        if self.is_sliding(now) {
            return Some(FRAME);
        }
        // The indicator shrinks continuously; refresh it at a modest rate.
        self.countdown
            .map(|c| c.remaining(now).min(Duration::from_millis(100)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn auto_dismiss_never_fires_early() {
        let t0 = Instant::now();
        let mut popup = Popup::open(PopupKind::Suggestion, ScreenRect::default(), 0, t0);
        assert_eq!(popup.countdown().map(Countdown::duration), Some(ms(15_000)));

        assert!(!popup.tick(t0 + ms(14_899)));
        assert_eq!(popup.phase(t0 + ms(14_899)), PopupPhase::AutoDismissing);

        assert!(popup.tick(t0 + ms(15_000)));
        assert_eq!(
            popup.take_decision(),
            Some(Decision {
                outcome: PopupOutcome::Rejected,
                source: DecisionSource::Timeout,
            })
        );
        assert_eq!(popup.phase(t0 + ms(15_000)), PopupPhase::Closed);
    }

    #[test]
    fn first_decision_wins() {
        let t0 = Instant::now();
        let mut popup = Popup::open(PopupKind::Suggestion, ScreenRect::default(), 0, t0);
        assert!(popup.accept());
        assert!(!popup.reject());
        assert!(!popup.tick(t0 + ms(20_000)));
        assert_eq!(popup.phase(t0), PopupPhase::Deciding);
        let decision = popup.take_decision().unwrap();
        assert_eq!(decision.outcome, PopupOutcome::Accepted);
        assert_eq!(decision.source, DecisionSource::User);
    }

    #[test]
    fn closed_popup_ignores_actions() {
        let t0 = Instant::now();
        let mut popup = Popup::open(PopupKind::SummaryReady, ScreenRect::default(), 0, t0);
        popup.reject();
        popup.take_decision();
        assert!(!popup.accept());
        assert_eq!(popup.take_decision(), None);
        assert_eq!(popup.next_wakeup(t0), None);
    }

    #[test]
    fn indicator_shrinks_linearly() {
        let t0 = Instant::now();
        let countdown = Countdown::new(t0, ms(15_000));
        assert_eq!(countdown.remaining_percent(t0), 100.0);
        assert!((countdown.remaining_percent(t0 + ms(7_500)) - 50.0).abs() < 0.01);
        assert_eq!(countdown.remaining_percent(t0 + ms(15_000)), 0.0);
        assert_eq!(countdown.remaining_percent(t0 + ms(30_000)), 0.0);
    }

    #[test]
    fn suggestion_slides_in_from_the_right() {
        let t0 = Instant::now();
        let screen = ScreenRect::from_size(1000.0, 800.0);
        let popup = Popup::open(PopupKind::Suggestion, screen, 0, t0);

        let start = popup.position(t0);
        assert_eq!(start, Point { x: 1010.0, y: 630.0 });
        assert_eq!(popup.phase(t0), PopupPhase::SlidingIn);

        let mid = popup.position(t0 + ms(200));
        assert!(mid.x < start.x && mid.x > 640.0);

        assert_eq!(popup.position(t0 + ms(400)), Point { x: 640.0, y: 630.0 });
        assert_eq!(popup.phase(t0 + ms(400)), PopupPhase::AutoDismissing);
    }

    #[test]
    fn left_anchored_popups_slide_from_offscreen_left() {
        let screen = ScreenRect::from_size(1000.0, 800.0);
        let (from, to) = PopupKind::ManualSummary.slide_path(screen, 0);
        assert_eq!(from, Point { x: -420.0, y: 510.0 });
        assert_eq!(to, Point { x: 20.0, y: 510.0 });

        let (_, to) = PopupKind::SummaryReady.slide_path(screen, 0);
        assert_eq!(to, Point { x: 20.0, y: 650.0 });
    }

    #[test]
    fn work_area_keeps_bottom_popups_above_the_taskbar() {
        let screen = ScreenRect::work_area(1000.0, 800.0);
        assert_eq!(screen.bottom, 800.0 - TASKBAR_RESERVE);

        let (_, rest) = PopupKind::Suggestion.slide_path(screen, 0);
        assert_eq!(rest, Point { x: 640.0, y: 800.0 - TASKBAR_RESERVE - 170.0 });
        assert!(rest.y + 150.0 <= 800.0 - TASKBAR_RESERVE);

        let (_, rest) = PopupKind::SummaryReady.slide_path(screen, 0);
        assert_eq!(rest.y, 650.0 - TASKBAR_RESERVE);

        assert_eq!(ScreenRect::work_area(100.0, 20.0).bottom, 0.0);
    }

    #[test]
    fn stacked_slots_are_lifted() {
        let screen = ScreenRect::from_size(1000.0, 800.0);
        let (_, first) = PopupKind::Suggestion.slide_path(screen, 0);
        let (_, second) = PopupKind::Suggestion.slide_path(screen, 1);
        assert_eq!(first.y - second.y, 150.0 + STACK_GAP);
        assert_eq!(first.x, second.x);
    }

    #[test]
    fn popup_without_countdown_stays_visible() {
        let t0 = Instant::now();
        let mut popup =
            Popup::with_countdown(PopupKind::Suggestion, ScreenRect::default(), 0, t0, None);
        assert!(!popup.tick(t0 + ms(60_000)));
        assert_eq!(popup.phase(t0 + ms(60_000)), PopupPhase::Visible);
        assert_eq!(popup.remaining_percent(t0), None);
    }

    #[test]
    fn out_cubic_easing_endpoints() {
        assert_eq!(Easing::OutCubic.apply(0.0), 0.0);
        assert_eq!(Easing::OutCubic.apply(1.0), 1.0);
        assert!(Easing::OutCubic.apply(0.5) > 0.5);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }
}
