use std::{
    io,
    time::{Duration, Instant},
};

use eframe::egui::{
    self, Context, Key, Modifiers, ProgressBar, RichText, ScrollArea, TextEdit, ViewportBuilder,
    ViewportCommand, ViewportId, pos2, vec2,
};
use gem_core::{HealthTransition, MailMethod, PeriodicTask, PopupKind, ScreenRect};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use crate::{
    config::GemConfig,
    health::HealthMonitor,
    log_viewer::LogViewer,
    popups::{ActivePopup, PopupContent, PopupEffect, PopupId, PopupManager},
    process::{self, ProcessController},
    settings_store::SettingsStore,
    watcher::SuggestionWatcher,
};

pub const STATUS_IDLE: &str = "Status: Idle";
pub const STATUS_STARTING: &str = "Status: Starting...";
pub const STATUS_RUNNING: &str = "Status: Running!";
pub const STATUS_HEALTH_FAILED: &str = "Status: Failed to start backend";
pub const STATUS_STOPPED: &str = "Status: Stopped";
pub const STATUS_LAUNCH_FAILED: &str = "Status: Backend start failed";

const LAUNCH_FAILED_MESSAGE: &str = "Failed to start backend process.";
const HEALTH_TIMEOUT_MESSAGE: &str = "Backend did not become healthy in time.";

/// Frame cadence while results from the runtime may be pending.
const UI_POLL_INTERVAL: Duration = Duration::from_millis(100);
const IDLE_REPAINT_INTERVAL: Duration = Duration::from_secs(1);
const LOADING_DOT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("tokio runtime init failed: {0}")]
    Runtime(#[source] io::Error),
    #[error("http client init failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// "Starting" with a cycling run of dots while the health check is running.
#[derive(Debug, Clone)]
enum LoadingLabel {
    Hidden,
    Starting { dots: usize, task: PeriodicTask },
    Failed,
}

impl LoadingLabel {
    fn starting(now: Instant) -> Self {
        LoadingLabel::Starting {
            dots: 0,
            task: PeriodicTask::started(LOADING_DOT_INTERVAL, now),
        }
    }

    fn tick(&mut self, now: Instant) {
        if let LoadingLabel::Starting { dots, task } = self {
            if task.poll(now) {
                *dots = (*dots + 1) % 4;
            }
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            LoadingLabel::Hidden => None,
            LoadingLabel::Starting { dots, .. } => Some(format!("Starting{}", ".".repeat(*dots))),
            LoadingLabel::Failed => Some("Failed to Start.".to_owned()),
        }
    }

    fn until_due(&self, now: Instant) -> Option<Duration> {
        match self {
            LoadingLabel::Starting { task, .. } => task.until_due(now),
            LoadingLabel::Hidden | LoadingLabel::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PopupChoice {
    Accept,
    Reject,
}

pub struct GemApp {
    settings: SettingsStore,
    process: ProcessController,
    health: HealthMonitor,
    watcher: SuggestionWatcher,
    popups: PopupManager,
    log_viewer: LogViewer,
    status: &'static str,
    loading: LoadingLabel,
    new_app: String,
    new_window: String,
    selected_app: Option<usize>,
    selected_window: Option<usize>,
    // Dropped last so in-flight probes are aborted before the runtime goes away.
    _runtime: Runtime,
}

impl GemApp {
    pub fn new(config: GemConfig) -> Result<Self, AppInitError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gem-runtime")
            .enable_all()
            .build()
            .map_err(AppInitError::Runtime)?;

        let now = Instant::now();
        let paths = &config.paths;
        let health = HealthMonitor::new(config.health_url.clone(), runtime.handle().clone())
            .map_err(AppInitError::HttpClient)?;

        info!(root = %paths.root().display(), health_url = %config.health_url, "gem starting");
        Ok(Self {
            settings: SettingsStore::load(paths.settings_file()),
            process: ProcessController::from_paths(config.interpreter.clone(), paths),
            health,
            watcher: SuggestionWatcher::new(paths, now),
            popups: PopupManager::new(paths, config.suggestion_timeout),
            log_viewer: LogViewer::new(paths.backend_log_file()),
            status: STATUS_IDLE,
            loading: LoadingLabel::Hidden,
            new_app: String::new(),
            new_window: String::new(),
            selected_app: None,
            selected_window: None,
            _runtime: runtime,
        })
    }

    fn start_backend(&mut self, now: Instant) {
        match self.process.start() {
            Ok(()) => {
                self.status = STATUS_STARTING;
                self.loading = LoadingLabel::starting(now);
                self.health.begin(now);
            }
            Err(err) => {
                error!("{err}");
                self.status = STATUS_LAUNCH_FAILED;
                self.loading = LoadingLabel::Hidden;
                show_error(LAUNCH_FAILED_MESSAGE);
            }
        }
    }

    fn stop_backend(&mut self) {
        self.health.cancel();
        self.process.stop();
        self.status = STATUS_STOPPED;
        self.loading = LoadingLabel::Hidden;
    }

    fn pump_health(&mut self, ctx: &Context, now: Instant) {
        match self.health.pump(now) {
            Some(HealthTransition::Healthy) => {
                self.status = STATUS_RUNNING;
                self.loading = LoadingLabel::Hidden;
                ctx.send_viewport_cmd(ViewportCommand::Minimized(true));
            }
            Some(HealthTransition::TimedOut) => {
                self.status = STATUS_HEALTH_FAILED;
                self.loading = LoadingLabel::Failed;
                show_error(HEALTH_TIMEOUT_MESSAGE);
            }
            Some(HealthTransition::Retrying { attempts }) => {
                debug!(attempts, "backend not ready yet");
            }
            Some(HealthTransition::Stale) | None => {}
        }
    }

    fn pump_mailbox(&mut self, now: Instant) {
        for event in self.watcher.poll(now) {
            self.popups.handle_mailbox(event, now);
        }
        for effect in self.popups.tick(now) {
            match effect {
                PopupEffect::OpenFile(path) => {
                    if let Err(err) = process::open_path(&path) {
                        warn!("{err}");
                    }
                }
            }
        }
    }

    // egui reports the monitor size only, not its origin or work area.
    fn track_screen(&mut self, ctx: &Context) {
        if let Some(size) = ctx.input(|i| i.viewport().monitor_size) {
            self.popups.set_screen(ScreenRect::work_area(size.x, size.y));
        }
    }

    fn toggle_log_viewer(&mut self, now: Instant) {
        if self.log_viewer.is_open() {
            self.log_viewer.close();
        } else {
            self.log_viewer.open(now);
        }
    }

    fn next_wakeup(&self, now: Instant) -> Duration {
        let mut wakeup = [
            self.watcher.until_due(now),
            self.health.until_next_tick(now),
            self.loading.until_due(now),
            self.popups.next_wakeup(now),
            self.log_viewer.until_due(now),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(IDLE_REPAINT_INTERVAL);

        if self.health.until_next_tick(now).is_some() {
            wakeup = wakeup.min(UI_POLL_INTERVAL);
        }
        wakeup
    }

    fn main_panel(&mut self, ui: &mut egui::Ui, now: Instant) {
        ui.heading("Gem");
        ui.horizontal(|ui| {
            if ui.button("Start").clicked() {
                self.start_backend(now);
            }
            if ui.button("Stop").clicked() {
                self.stop_backend();
            }
        });
        ui.label(self.status);
        if let Some(text) = self.loading.text() {
            ui.label(text);
        }

        ui.separator();
        ui.label("App Blacklist:");
        list_box(
            ui,
            "blacklisted-apps",
            &self.settings.settings().blacklisted_apps,
            &mut self.selected_app,
        );
        ui.horizontal(|ui| {
            ui.add(TextEdit::singleline(&mut self.new_app).hint_text("process name"));
            if ui.button("Add App").clicked() {
                persist(self.settings.add_app(&self.new_app));
                self.new_app.clear();
            }
        });
        if ui.button("Remove Selected App").clicked() {
            if let Some(index) = self.selected_app.take() {
                persist(self.settings.remove_app(index));
            }
        }

        ui.separator();
        ui.label("Window Title Blacklist:");
        list_box(
            ui,
            "blacklisted-windows",
            &self.settings.settings().blacklisted_windows,
            &mut self.selected_window,
        );
        ui.horizontal(|ui| {
            ui.add(TextEdit::singleline(&mut self.new_window).hint_text("window title"));
            if ui.button("Add Window").clicked() {
                persist(self.settings.add_window(&self.new_window));
                self.new_window.clear();
            }
        });
        if ui.button("Remove Selected Window").clicked() {
            if let Some(index) = self.selected_window.take() {
                persist(self.settings.remove_window(index));
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Preferred Mail:");
            let current = self.settings.settings().preferred_mail;
            let mut chosen = current;
            egui::ComboBox::from_id_salt("preferred-mail")
                .selected_text(current.map(MailMethod::as_str).unwrap_or(""))
                .show_ui(ui, |ui| {
                    for method in MailMethod::ALL {
                        ui.selectable_value(&mut chosen, Some(method), method.as_str());
                    }
                });
            if let (Some(method), true) = (chosen, chosen != current) {
                persist(self.settings.set_mail(method).map(|()| true));
            }
        });
    }

    fn show_popups(&mut self, ctx: &Context, now: Instant) {
        let ids: Vec<PopupId> = self.popups.iter().map(ActivePopup::id).collect();
        for id in ids {
            let Some(active) = self.popups.get(id) else {
                continue;
            };
            let kind = active.content().kind();
            let size = kind.size();
            let pos = active.popup().position(now);
            let sliding = active.popup().is_sliding(now);
            let builder = ViewportBuilder::default()
                .with_title(popup_title(kind))
                .with_position(pos2(pos.x, pos.y))
                .with_inner_size(vec2(size.w, size.h))
                .with_decorations(false)
                .with_always_on_top()
                .with_resizable(false)
                .with_taskbar(false);

            let popups = &mut self.popups;
            let choice = ctx.show_viewport_immediate(
                ViewportId::from_hash_of(("gem-popup", id)),
                builder,
                |ctx, _class| {
                    if sliding {
                        ctx.send_viewport_cmd(ViewportCommand::OuterPosition(pos2(pos.x, pos.y)));
                    }
                    egui::CentralPanel::default()
                        .show(ctx, |ui| popup_body(ui, popups, id, now))
                        .inner
                },
            );

            match choice {
                Some(PopupChoice::Accept) => {
                    self.popups.accept(id);
                }
                Some(PopupChoice::Reject) => {
                    self.popups.reject(id);
                }
                None => {}
            }
        }
    }

    fn show_log_viewer(&mut self, ctx: &Context, now: Instant) {
        if !self.log_viewer.is_open() {
            return;
        }

        let viewer = &mut self.log_viewer;
        let close = ctx.show_viewport_immediate(
            ViewportId::from_hash_of("gem-debug-log"),
            ViewportBuilder::default()
                .with_title("Debug Log Viewer")
                .with_inner_size([600.0, 400.0]),
            |ctx, _class| {
                egui::TopBottomPanel::bottom("debug-log-actions").show(ctx, |ui| {
                    if ui.button("Clear Log").clicked() {
                        if let Err(err) = viewer.clear() {
                            warn!(path = %viewer.path().display(), "log clear failed: {err}");
                        }
                    }
                });
                egui::CentralPanel::default().show(ctx, |ui| {
                    ScrollArea::vertical()
                        .stick_to_bottom(true)
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            ui.label(RichText::new(viewer.display()).monospace());
                        });
                });
                ctx.input(|i| i.viewport().close_requested()) || toggle_requested(ctx)
            },
        );

        if close {
            self.log_viewer.close();
        } else {
            self.log_viewer.poll(now);
        }
    }
}

impl eframe::App for GemApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.track_screen(ctx);
        if toggle_requested(ctx) {
            self.toggle_log_viewer(now);
        }
        self.pump_health(ctx, now);
        self.loading.tick(now);
        self.pump_mailbox(now);

        egui::CentralPanel::default().show(ctx, |ui| self.main_panel(ui, now));
        self.show_popups(ctx, now);
        self.show_log_viewer(ctx, now);

        ctx.request_repaint_after(self.next_wakeup(now));
    }
}

/// Ctrl+Shift+D.
fn toggle_requested(ctx: &Context) -> bool {
    ctx.input_mut(|i| i.consume_key(Modifiers::CTRL | Modifiers::SHIFT, Key::D))
}

fn popup_title(kind: PopupKind) -> &'static str {
    match kind {
        PopupKind::Suggestion => "Gem Suggestion",
        PopupKind::ManualSummary => "Gem Summary",
        PopupKind::SummaryReady => "Gem Summary Ready",
    }
}

fn button_labels(kind: PopupKind) -> (&'static str, &'static str) {
    match kind {
        PopupKind::Suggestion => ("Accept", "Reject"),
        PopupKind::ManualSummary => ("OK", "No"),
        PopupKind::SummaryReady => ("Download", "Dismiss"),
    }
}

fn popup_body(
    ui: &mut egui::Ui,
    popups: &mut PopupManager,
    id: PopupId,
    now: Instant,
) -> Option<PopupChoice> {
    let active = popups.get(id)?;
    let kind = active.content().kind();
    let remaining = active.popup().remaining_percent(now);
    let detail = match active.content() {
        PopupContent::Suggestion(suggestion) => Some(suggestion.message()),
        PopupContent::ManualSummary { .. } => None,
        PopupContent::SummaryReady { path } => Some(path.display().to_string()),
    };

    match kind {
        PopupKind::Suggestion => {
            ui.label(detail.unwrap_or_default());
        }
        PopupKind::ManualSummary => {
            ui.label("📝 Enter Text To Summarise:");
            if let Some(draft) = popups.draft_mut(id) {
                ui.add(
                    TextEdit::multiline(draft)
                        .desired_rows(5)
                        .desired_width(f32::INFINITY),
                );
            }
        }
        PopupKind::SummaryReady => {
            ui.label(RichText::new("📄 Summary ready").strong());
            ui.label(detail.unwrap_or_default());
        }
    }

    let (accept, reject) = button_labels(kind);
    let mut choice = None;
    ui.horizontal(|ui| {
        if ui.button(accept).clicked() {
            choice = Some(PopupChoice::Accept);
        }
        if ui.button(reject).clicked() {
            choice = Some(PopupChoice::Reject);
        }
    });

    if let Some(percent) = remaining {
        ui.add(ProgressBar::new(percent / 100.0).desired_height(4.0));
    }
    choice
}

fn list_box(ui: &mut egui::Ui, id: &str, items: &[String], selected: &mut Option<usize>) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ScrollArea::vertical()
            .id_salt(id)
            .max_height(110.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (index, item) in items.iter().enumerate() {
                    if ui
                        .selectable_label(*selected == Some(index), item)
                        .clicked()
                    {
                        *selected = Some(index);
                    }
                }
            });
    });
}

fn persist<E: std::fmt::Display>(result: Result<bool, E>) {
    if let Err(err) = result {
        warn!("settings not saved: {err}");
    }
}

fn show_error(message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Gem")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_dots_cycle_every_half_second() {
        let t0 = Instant::now();
        let mut label = LoadingLabel::starting(t0);
        assert_eq!(label.text().as_deref(), Some("Starting"));

        let mut seen = Vec::new();
        for n in 1..=4 {
            label.tick(t0 + LOADING_DOT_INTERVAL * n);
            seen.push(label.text().unwrap_or_default());
        }
        assert_eq!(
            seen,
            vec!["Starting.", "Starting..", "Starting...", "Starting"]
        );
    }

    #[test]
    fn failed_label_is_static() {
        let mut label = LoadingLabel::Failed;
        label.tick(Instant::now() + Duration::from_secs(10));
        assert_eq!(label.text().as_deref(), Some("Failed to Start."));
        assert_eq!(label.until_due(Instant::now()), None);
        assert_eq!(LoadingLabel::Hidden.text(), None);
    }

    #[test]
    fn every_popup_kind_has_two_buttons() {
        assert_eq!(button_labels(PopupKind::Suggestion), ("Accept", "Reject"));
        assert_eq!(button_labels(PopupKind::ManualSummary), ("OK", "No"));
        assert_eq!(button_labels(PopupKind::SummaryReady), ("Download", "Dismiss"));
    }
}
