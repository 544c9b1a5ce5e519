use std::fmt;
use std::time::Duration;

use crate::{ExtractionSettings, Table};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Publishing,
    Waiting,
    Failed,
}

/// The step of a cycle an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Fetch,
    Extract,
    PublishHeaders,
    PublishBody,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStep::Fetch => write!(f, "fetch"),
            SyncStep::Extract => write!(f, "extract"),
            SyncStep::PublishHeaders => write!(f, "publish-headers"),
            SyncStep::PublishBody => write!(f, "publish-body"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle: u64,
    pub header_count: usize,
    pub row_count: usize,
    pub dropped_cells: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverState {
    phase: Phase,
    cycle: u64,
    settings: ExtractionSettings,
    interval: Duration,
    pending_body: Option<Table>,
    current: Option<CycleSummary>,
    last_summary: Option<CycleSummary>,
    failed_step: Option<SyncStep>,
}

impl Default for DriverState {
    fn default() -> Self {
        Self::new(ExtractionSettings::default(), DEFAULT_INTERVAL)
    }
}

impl DriverState {
    pub fn new(settings: ExtractionSettings, interval: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            cycle: 0,
            settings,
            interval,
            pending_body: None,
            current: None,
            last_summary: None,
            failed_step: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of cycles started so far; the running cycle's number.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Summary of the most recent cycle that published both ranges.
    pub fn last_summary(&self) -> Option<CycleSummary> {
        self.last_summary
    }

    pub fn failed_step(&self) -> Option<SyncStep> {
        self.failed_step
    }

    pub(crate) fn begin_cycle(&mut self) {
        self.cycle += 1;
        self.phase = Phase::Fetching;
        self.pending_body = None;
        self.current = None;
        self.failed_step = None;
    }

    pub(crate) fn begin_publishing(&mut self, summary: CycleSummary, body: Table) {
        self.phase = Phase::Publishing;
        self.current = Some(summary);
        self.pending_body = Some(body);
    }

    pub(crate) fn has_pending_body(&self) -> bool {
        self.pending_body.is_some()
    }

    pub(crate) fn take_pending_body(&mut self) -> Option<Table> {
        self.pending_body.take()
    }

    pub(crate) fn finish_cycle(&mut self) {
        self.phase = Phase::Waiting;
        self.last_summary = self.current.take();
    }

    pub(crate) fn fail(&mut self, step: SyncStep) {
        self.phase = Phase::Failed;
        self.pending_body = None;
        self.current = None;
        self.failed_step = Some(step);
    }
}
