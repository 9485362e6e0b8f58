// Two-screen flow: landing page, then the dashboard. File loads go through
// tickets so a result can only be applied by the load that is in flight.
use crate::analysis::analyze;
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::error::DashboardError;
use crate::loader;
use crate::types::RawSheet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Empty,
    Populated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Dashboard(Panel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Rendered,
    Failed(DashboardError),
    /// A newer load was started; this result was thrown away.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub message: String,
    raised_at: Instant,
    ttl: Duration,
}

impl Alert {
    pub fn is_active_at(&self, now: Instant) -> bool {
        now.duration_since(self.raised_at) < self.ttl
    }
}

#[derive(Debug)]
pub struct Controller {
    screen: Screen,
    dashboard: Dashboard,
    alert: Option<Alert>,
    alert_ttl: Duration,
    file_name: Option<String>,
    next_ticket: u64,
    in_flight: Option<LoadTicket>,
}

impl Controller {
    /// Start on the landing screen with an empty dashboard.
    ///
    /// Whatever a previous run left in the output directory (page, exports,
    /// numbered chart files) is cleared first.
    pub fn new(config: AppConfig) -> Self {
        let alert_ttl = config.alert_ttl;
        let mut dashboard = Dashboard::new(config);
        dashboard.reset();
        info!("circuit dashboard started");
        Self {
            screen: Screen::Landing,
            dashboard,
            alert: None,
            alert_ttl,
            file_name: None,
            next_ticket: 0,
            in_flight: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn enter_dashboard(&mut self) {
        if self.screen == Screen::Landing {
            self.screen = Screen::Dashboard(Panel::Empty);
        }
    }

    /// Whether a ticket has been handed out and not yet completed.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a load. `None` while on the landing screen or while another
    /// load is still in flight.
    pub fn begin_load(&mut self, file_name: &str) -> Option<LoadTicket> {
        if self.screen == Screen::Landing || self.in_flight.is_some() {
            return None;
        }
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        self.in_flight = Some(ticket);
        self.file_name = Some(file_name.to_string());
        self.alert = None;
        Some(ticket)
    }

    /// Apply a decoded sheet (or its decode error) for `ticket`.
    ///
    /// - A ticket that is not the one in flight gets [`LoadOutcome::Stale`]
    ///   and changes nothing.
    /// - Otherwise the sheet is analyzed and rendered, replacing the whole
    ///   view, and the panel becomes populated.
    /// - Any error along the way (decode, analysis or export) resets the
    ///   dashboard to its empty state and raises an alert carrying the
    ///   error's user text. The error is also handed back.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        decoded: Result<RawSheet, DashboardError>,
    ) -> LoadOutcome {
        if self.in_flight != Some(ticket) {
            info!(ticket = ticket.0, "discarding stale load result");
            return LoadOutcome::Stale;
        }
        self.in_flight = None;

        let file_name = self.file_name.clone().unwrap_or_default();
        let rendered = decoded
            .and_then(|sheet| analyze(&sheet))
            .and_then(|analysis| self.dashboard.render(analysis, &file_name));
        match rendered {
            Ok(()) => {
                self.screen = Screen::Dashboard(Panel::Populated);
                LoadOutcome::Rendered
            }
            Err(e) => {
                error!(file = %file_name, error = %e, detail = e.detail().unwrap_or(""), "load failed");
                self.fail(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Decode `path` and apply it in one step. `None` when the load could
    /// not start (see [`Controller::begin_load`]).
    pub fn load_file(&mut self, path: &Path) -> Option<LoadOutcome> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let ticket = self.begin_load(&file_name)?;
        let decoded = loader::read_sheet(path);
        Some(self.complete_load(ticket, decoded))
    }

    /// Filter the detail table by circuit id; returns the visible row count,
    /// or `None` when nothing is rendered.
    pub fn search(&mut self, term: &str) -> Option<usize> {
        let view = self.dashboard.view_mut()?;
        view.table.filter(term);
        Some(view.table.visible_count())
    }

    pub fn active_alert(&self, now: Instant) -> Option<&str> {
        self.alert
            .as_ref()
            .filter(|a| a.is_active_at(now))
            .map(|a| a.message.as_str())
    }

    fn fail(&mut self, message: String) {
        self.dashboard.reset();
        self.screen = Screen::Dashboard(Panel::Empty);
        self.alert = Some(Alert {
            message,
            raised_at: Instant::now(),
            ttl: self.alert_ttl,
        });
    }
}
