use engine_logging::{engine_error, engine_info};

use crate::sync::{SyncCycle, SyncError};

/// What to do after a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry,
    Abort,
}

/// Decides whether a failed cycle ends the run.
pub trait Supervisor: Send {
    /// `consecutive_failures` counts this failure too.
    fn on_failure(&mut self, error: &SyncError, consecutive_failures: u32) -> Decision;
}

/// Stops at the first failure and leaves restarts to the process supervisor.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl Supervisor for FailFast {
    fn on_failure(&mut self, _error: &SyncError, _consecutive_failures: u32) -> Decision {
        Decision::Abort
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles_attempted: u64,
    pub cycles_completed: u64,
}

/// Repeats sync cycles with the driver's fixed delay between them.
pub struct Scheduler<S = FailFast> {
    supervisor: S,
    max_cycles: Option<u64>,
}

impl Default for Scheduler<FailFast> {
    fn default() -> Self {
        Self::new(FailFast)
    }
}

impl<S: Supervisor> Scheduler<S> {
    pub fn new(supervisor: S) -> Self {
        Self {
            supervisor,
            max_cycles: None,
        }
    }

    /// Stop cleanly after `max_cycles` attempts instead of running forever.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    fn limit_reached(&self, attempted: u64) -> bool {
        self.max_cycles.is_some_and(|max| attempted >= max)
    }

    /// Runs until the supervisor aborts (returning the error) or the cycle
    /// limit is reached. Without a limit it only returns on failure.
    pub async fn run(&mut self, cycle: &mut SyncCycle) -> Result<RunSummary, SyncError> {
        let mut summary = RunSummary::default();
        let mut consecutive_failures = 0u32;

        while !self.limit_reached(summary.cycles_attempted) {
            summary.cycles_attempted += 1;
            let delay = match cycle.run_once().await {
                Ok(report) => {
                    summary.cycles_completed += 1;
                    consecutive_failures = 0;
                    engine_info!(
                        "cycle complete: {} header(s), {} row(s)",
                        report.summary.header_count,
                        report.summary.row_count
                    );
                    report.next_delay
                }
                Err(err) => {
                    consecutive_failures += 1;
                    match err.step() {
                        Some(step) => engine_error!("cycle failed at step {}: {}", step, err),
                        None => engine_error!("cycle failed: {}", err),
                    }
                    match self.supervisor.on_failure(&err, consecutive_failures) {
                        Decision::Abort => return Err(err),
                        Decision::Retry => cycle.interval(),
                    }
                }
            };
            if !self.limit_reached(summary.cycles_attempted) {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(summary)
    }
}
