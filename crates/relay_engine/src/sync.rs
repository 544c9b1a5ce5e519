use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use relay_core::{
    update, CycleSummary, DriverState, Effect, ExtractionSettings, Msg, ParseError, Phase,
    SyncStep,
};
use thiserror::Error;

use crate::fetch::Fetcher;
use crate::sheets::{PublishError, SheetTarget, SpreadsheetClient};
use crate::{CredentialError, FetchError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching the source page failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("extracting the table failed: {0}")]
    Parse(#[from] ParseError),
    #[error("credentials for {step} failed: {source}")]
    Credential {
        step: SyncStep,
        #[source]
        source: CredentialError,
    },
    #[error("{step} was rejected: {source}")]
    Publish {
        step: SyncStep,
        #[source]
        source: PublishError,
    },
    #[error("sync driver stalled in phase {0:?}")]
    Stalled(Phase),
}

impl SyncError {
    /// The cycle step that failed, if the failure belongs to one.
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            SyncError::Fetch(_) => Some(SyncStep::Fetch),
            SyncError::Parse(_) => Some(SyncStep::Extract),
            SyncError::Credential { step, .. } | SyncError::Publish { step, .. } => Some(*step),
            SyncError::Stalled(_) => None,
        }
    }

    fn publishing(step: SyncStep, err: PublishError) -> Self {
        match err {
            PublishError::Credential(source) => SyncError::Credential { step, source },
            source => SyncError::Publish { step, source },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub summary: CycleSummary,
    /// Delay the driver asked for before the next cycle.
    pub next_delay: Duration,
}

/// Runs one fetch → extract → publish pass per call by feeding the outcome
/// of every effect back into the driver state machine.
pub struct SyncCycle {
    fetcher: Arc<dyn Fetcher>,
    sheets: Arc<dyn SpreadsheetClient>,
    source_url: String,
    target: SheetTarget,
    state: DriverState,
}

impl SyncCycle {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        sheets: Arc<dyn SpreadsheetClient>,
        source_url: impl Into<String>,
        target: SheetTarget,
        settings: ExtractionSettings,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            sheets,
            source_url: source_url.into(),
            target,
            state: DriverState::new(settings, interval),
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn interval(&self) -> Duration {
        self.state.interval()
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        effects
    }

    fn fail(&mut self, step: SyncStep) {
        self.dispatch(Msg::StepFailed(step));
    }

    /// Execute one bounded cycle. Never sleeps; the returned report carries
    /// the delay the caller should wait before the next call.
    pub async fn run_once(&mut self) -> Result<CycleReport, SyncError> {
        let mut queue: VecDeque<Effect> = self.dispatch(Msg::CycleStarted).into();
        engine_logging::set_cycle(self.state.cycle());

        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::FetchDocument => match self.fetcher.fetch(&self.source_url).await {
                    Ok(doc) => {
                        engine_info!(
                            "fetched {} ({} bytes, {})",
                            doc.metadata.final_url,
                            doc.metadata.byte_len,
                            doc.metadata.encoding
                        );
                        Msg::DocumentFetched(doc.html)
                    }
                    Err(err) => {
                        self.fail(SyncStep::Fetch);
                        return Err(err.into());
                    }
                },
                Effect::RejectDocument(err) => return Err(err.into()),
                Effect::PublishHeaders(headers) => {
                    let values = vec![headers.into_labels()];
                    self.publish(SyncStep::PublishHeaders, values).await?;
                    Msg::HeadersPublished
                }
                Effect::PublishBody(table) => {
                    if table.dropped_cells() > 0 {
                        engine_warn!(
                            "dropped {} trailing cell(s) that did not fill a {}-cell row",
                            table.dropped_cells(),
                            table.width().get()
                        );
                    }
                    self.publish(SyncStep::PublishBody, table.to_values()).await?;
                    Msg::BodyPublished
                }
                Effect::Sleep(next_delay) => {
                    let summary = self
                        .state
                        .last_summary()
                        .ok_or(SyncError::Stalled(self.state.phase()))?;
                    return Ok(CycleReport {
                        summary,
                        next_delay,
                    });
                }
            };
            queue.extend(self.dispatch(msg));
        }

        Err(SyncError::Stalled(self.state.phase()))
    }

    async fn publish(&mut self, step: SyncStep, values: Vec<Vec<String>>) -> Result<(), SyncError> {
        let range = match step {
            SyncStep::PublishHeaders => &self.target.header_range,
            _ => &self.target.body_range,
        };
        let rows = values.len();
        match self.sheets.update_values(range, values).await {
            Ok(summary) => {
                engine_info!(
                    "{} wrote {} row(s) to {} ({} cells updated)",
                    step,
                    rows,
                    range,
                    summary.updated_cells
                );
                Ok(())
            }
            Err(err) => {
                self.fail(step);
                Err(SyncError::publishing(step, err))
            }
        }
    }
}
