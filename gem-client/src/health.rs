//! Backend readiness polling.
//!
//! [`HealthMonitor`] drives a [`HealthCheck`] from the UI loop: each due tick
//! spawns one HTTP probe on the runtime, and the result comes back over a
//! channel tagged with the token it was issued under.

use std::{
    sync::mpsc,
    time::{Duration, Instant},
};

use gem_core::{HealthCheck, HealthPhase, HealthTransition, TaskToken};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

pub const HEALTH_URL: &str = "http://localhost:3030/health";
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// One `GET`; any 2xx counts as healthy.
pub async fn probe_health(client: &reqwest::Client, url: &Url) -> bool {
    match client.get(url.clone()).send().await {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp) => {
            debug!(status = %resp.status(), "health probe not ready");
            false
        }
        Err(err) => {
            debug!("health probe failed: {err}");
            false
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProbeResult {
    token: TaskToken,
    healthy: bool,
}

pub struct HealthMonitor {
    check: HealthCheck,
    url: Url,
    client: reqwest::Client,
    runtime: Handle,
    results_tx: mpsc::Sender<ProbeResult>,
    results_rx: mpsc::Receiver<ProbeResult>,
    in_flight: Vec<JoinHandle<()>>,
}

impl HealthMonitor {
    pub fn new(url: Url, runtime: Handle) -> Result<Self, reqwest::Error> {
        Self::with_check(url, runtime, HealthCheck::new())
    }

    pub fn with_check(
        url: Url,
        runtime: Handle,
        check: HealthCheck,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .no_proxy()
            .build()?;
        let (results_tx, results_rx) = mpsc::channel();
        Ok(Self {
            check,
            url,
            client,
            runtime,
            results_tx,
            results_rx,
            in_flight: Vec::new(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn phase(&self) -> HealthPhase {
        self.check.phase()
    }

    /// Starts a fresh run; anything still in flight from an earlier run is dropped.
    pub fn begin(&mut self, now: Instant) {
        self.abort_in_flight();
        self.check.begin(now);
        info!(url = %self.url, max_attempts = self.check.max_attempts(), "health polling started");
    }

    pub fn cancel(&mut self) {
        if self.check.is_polling() {
            info!("health polling cancelled");
        }
        self.abort_in_flight();
        self.check.cancel();
    }

    /// Collects finished probes and issues the next one when due.
    ///
    /// Returns the latest state change, if any; stale results are swallowed.
    pub fn pump(&mut self, now: Instant) -> Option<HealthTransition> {
        let mut latest = None;
        while let Ok(result) = self.results_rx.try_recv() {
            match self.check.record(result.token, result.healthy) {
                HealthTransition::Stale => debug!("stale health result dropped"),
                transition => latest = Some(transition),
            }
        }

        match latest {
            Some(HealthTransition::Healthy) => {
                info!("backend healthy");
                self.abort_in_flight();
            }
            Some(HealthTransition::TimedOut) => {
                warn!(attempts = self.check.max_attempts(), "backend did not become healthy");
                self.abort_in_flight();
            }
            _ => {}
        }

        if let Some(token) = self.check.poll(now) {
            self.spawn_probe(token);
        }
        latest
    }

    pub fn until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.check.until_next_tick(now)
    }

    fn spawn_probe(&mut self, token: TaskToken) {
        self.in_flight.retain(|handle| !handle.is_finished());

        let client = self.client.clone();
        let url = self.url.clone();
        let tx = self.results_tx.clone();
        let handle = self.runtime.spawn(async move {
            let healthy = probe_health(&client, &url).await;
            let _ = tx.send(ProbeResult { token, healthy });
        });
        self.in_flight.push(handle);
    }

    fn abort_in_flight(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}
