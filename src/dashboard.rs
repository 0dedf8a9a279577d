// Dashboard Module - Session controller for the poll/render cycle and commands
use std::collections::VecDeque;
use std::future::Future;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::{Backend, FetchError};
use crate::connectivity::ConnectivityState;
use crate::dispatch;
use crate::dom::{self, Document, DomError};
use crate::modes::ModeRegistry;
use crate::palette::{self, Swatch};
use crate::poller::{self, PollIntervals, PollTimer};
use crate::renderer;
use crate::snapshot::DeviceSnapshot;

const EVENT_LOG_LEN: usize = 50;

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Rendered {
        modes_rebuilt: bool,
        strands: usize,
        leds: usize,
    },
    FetchFailed(FetchError),
    RenderFailed(DomError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub failures: u64,
}

/// Everything one dashboard session owns.
///
/// The controller is the only writer of the document, the mode registry,
/// the connectivity state and the poll timer. Front-ends read the document
/// and call back in through `poll`, `poll_now` and `send_command`.
pub struct Dashboard<B: Backend> {
    backend: B,
    document: Document,
    modes: ModeRegistry,
    connectivity: ConnectivityState,
    timer: PollTimer,
    intervals: PollIntervals,
    last_refresh: Option<OffsetDateTime>,
    stats: PollStats,
    events: VecDeque<String>,
}

impl<B: Backend> Dashboard<B> {
    /// Build the page, fill the color picker and arm the bootstrap poll.
    pub fn new(backend: B, intervals: PollIntervals, palette: &[Swatch]) -> Result<Self, DomError> {
        let mut document = Document::dashboard();
        palette::populate_color_picker(&mut document, palette)?;

        let connectivity = ConnectivityState::default();
        connectivity.apply(&mut document)?;

        let mut timer = PollTimer::new();
        timer.schedule(intervals.bootstrap);

        Ok(Dashboard {
            backend,
            document,
            modes: ModeRegistry::new(),
            connectivity,
            timer,
            intervals,
            last_refresh: None,
            stats: PollStats::default(),
            events: VecDeque::with_capacity(EVENT_LOG_LEN),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.connectivity
    }

    pub fn timer(&self) -> &PollTimer {
        &self.timer
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    pub fn last_refresh_label(&self) -> String {
        match self.last_refresh {
            Some(t) => format!("{} UTC", clock_label(t)),
            None => "never".to_string(),
        }
    }

    /// Run one poll cycle and schedule the next one at the steady interval.
    ///
    /// On success the indicator, the mode selector (if the mode count
    /// changed) and the strands are updated in that order. On failure only
    /// the indicator is re-applied, from the state it already had.
    pub async fn poll(&mut self) -> PollOutcome {
        self.timer.cancel();
        self.stats.cycles += 1;

        let fetched = self.backend.fetch_state().await;

        if let Ok(snapshot) = &fetched {
            self.connectivity = ConnectivityState::from(&snapshot.mqtt_status);
        }
        if let Err(e) = self.connectivity.apply(&mut self.document) {
            warn!(error = %e, "connectivity indicator not updated");
        }

        let outcome = match fetched {
            Ok(snapshot) => match self.apply_snapshot(&snapshot) {
                Ok(modes_rebuilt) => {
                    self.last_refresh = Some(OffsetDateTime::now_utc());
                    PollOutcome::Rendered {
                        modes_rebuilt,
                        strands: snapshot.strands.len(),
                        leds: snapshot.led_count(),
                    }
                }
                Err(e) => PollOutcome::RenderFailed(e),
            },
            Err(e) => PollOutcome::FetchFailed(e),
        };

        match &outcome {
            PollOutcome::Rendered { modes_rebuilt, strands, leds } => {
                debug!(strands, leds, modes_rebuilt, "state rendered");
                if *modes_rebuilt {
                    let line = format!("Mode list changed: {}", self.modes.modes().join(", "));
                    self.record(line);
                }
            }
            PollOutcome::FetchFailed(e) => {
                self.stats.failures += 1;
                warn!(error = %e, "state poll failed");
                self.record(format!("Poll failed: {}", e));
            }
            PollOutcome::RenderFailed(e) => {
                self.stats.failures += 1;
                warn!(error = %e, "state render failed");
                self.record(format!("Render failed: {}", e));
            }
        }

        self.timer.schedule(self.intervals.steady);
        outcome
    }

    /// Drop the pending timer and poll right away.
    pub async fn poll_now(&mut self) -> PollOutcome {
        self.timer.cancel();
        self.poll().await
    }

    fn apply_snapshot(&mut self, snapshot: &DeviceSnapshot) -> Result<bool, DomError> {
        // Strands are redrawn even when the selector could not be rebuilt
        let rebuilt = self.modes.reconcile(&mut self.document, &snapshot.modes);
        renderer::render_strands(&mut self.document, &snapshot.strands)?;
        rebuilt
    }

    /// Send a command path and, if it went through, show the reply and poll
    /// immediately so its effect appears without waiting a full interval.
    ///
    /// A failed command changes nothing: status text, timer and rendering
    /// stay as they were.
    pub async fn send_command(&mut self, path: &str) -> Result<String, FetchError> {
        match dispatch::send_command(&self.backend, path).await {
            Ok(body) => {
                match self.document.element_mut(dom::STATUS) {
                    Ok(status) => status.text = dispatch::status_text(path, &body),
                    Err(e) => warn!(error = %e, "status display not updated"),
                }
                self.record(format!("{} -> {}", path, body));
                self.poll_now().await;
                Ok(body)
            }
            Err(e) => {
                self.record(format!("{} failed: {}", path, e));
                Err(e)
            }
        }
    }

    /// Push the current document to the HTML mirror, if anyone is watching.
    pub fn publish(&self, page: &watch::Sender<String>) {
        if page.receiver_count() > 0 {
            page.send_replace(self.document.to_html());
        }
    }

    fn record(&mut self, line: String) {
        if self.events.len() == EVENT_LOG_LEN {
            self.events.pop_front();
        }
        self.events
            .push_back(format!("{} {}", clock_label(OffsetDateTime::now_utc()), line));
    }
}

fn clock_label(t: OffsetDateTime) -> String {
    t.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

/// Poll loop without a terminal: timer-driven polls plus commands forwarded
/// from the HTML mirror, until `shutdown` resolves.
pub async fn run_headless<B: Backend>(
    dashboard: &mut Dashboard<B>,
    mut commands: mpsc::Receiver<String>,
    page: watch::Sender<String>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut commands_open = true;
    dashboard.publish(&page);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, leaving poll loop");
                break;
            }
            _ = poller::wait_for(dashboard.timer().deadline()) => {
                dashboard.poll().await;
            }
            maybe_path = commands.recv(), if commands_open => {
                match maybe_path {
                    Some(path) => {
                        let _ = dashboard.send_command(&path).await;
                    }
                    None => commands_open = false,
                }
            }
        }
        dashboard.publish(&page);
    }
}
