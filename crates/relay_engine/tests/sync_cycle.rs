use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_core::{ExtractionSettings, ParseError, Phase, SyncStep};
use relay_engine::{
    Decision, FailureKind, FetchError, FetchMetadata, Fetcher, PublishError, RawDocument,
    RunSummary, Scheduler, SheetTarget, SpreadsheetClient, Supervisor, SyncCycle, SyncError,
    UpdateSummary,
};

const PAGE: &str = r#"<html><body><h1>Rates</h1>
<div class="table-wrap"><table>
<tr><th>Name</th><th>Value</th></tr>
<tr><td>alpha</td><td>1</td></tr>
<tr><td>beta</td><td>2</td></tr>
</table></div>
</body></html>"#;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Replays scripted responses; the last one repeats forever.
struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
}

impl ScriptedFetcher {
    fn new(responses: Vec<Result<String, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }

    fn page(html: &str) -> Arc<Self> {
        Self::new(vec![Ok(html.to_string())])
    }
}

fn network_down() -> FetchError {
    FetchError {
        kind: FailureKind::Network,
        message: "connection refused".to_string(),
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        };
        next.map(|html| RawDocument {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirected: false,
                content_type: Some("text/html".to_string()),
                encoding: "UTF-8".to_string(),
                byte_len: html.len() as u64,
            },
            html,
        })
    }
}

#[derive(Default)]
struct RecordingSheets {
    writes: Mutex<Vec<(String, Vec<Vec<String>>)>>,
    reject_range: Option<String>,
}

impl RecordingSheets {
    fn rejecting(range: &str) -> Self {
        Self {
            reject_range: Some(range.to_string()),
            ..Self::default()
        }
    }

    fn writes(&self) -> Vec<(String, Vec<Vec<String>>)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SpreadsheetClient for RecordingSheets {
    async fn update_values(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, PublishError> {
        if self.reject_range.as_deref() == Some(range) {
            return Err(PublishError::Rejected {
                status: 403,
                message: "PERMISSION_DENIED".to_string(),
            });
        }
        let cells = values.iter().map(Vec::len).sum::<usize>() as u64;
        self.writes
            .lock()
            .unwrap()
            .push((range.to_string(), values));
        Ok(UpdateSummary {
            updated_range: range.to_string(),
            updated_cells: cells,
            ..UpdateSummary::default()
        })
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, PublishError> {
        Ok(self
            .writes()
            .into_iter()
            .rev()
            .find(|(written, _)| written == range)
            .map(|(_, values)| values)
            .unwrap_or_default())
    }
}

fn cycle(fetcher: Arc<ScriptedFetcher>, sheets: Arc<RecordingSheets>, interval: Duration) -> SyncCycle {
    SyncCycle::new(
        fetcher,
        sheets,
        "https://wiki.example/page",
        SheetTarget::default(),
        ExtractionSettings::default(),
        interval,
    )
}

fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

#[tokio::test]
async fn one_cycle_writes_headers_then_body() {
    init_logging();
    let sheets = Arc::new(RecordingSheets::default());
    let mut cycle = cycle(ScriptedFetcher::page(PAGE), sheets.clone(), Duration::from_secs(5));

    let report = cycle.run_once().await.unwrap();

    assert_eq!(
        sheets.writes(),
        vec![
            ("Page1!A1:B".to_string(), strings(&[&["Name", "Value"]])),
            (
                "Page1!A2:B".to_string(),
                strings(&[&["alpha", "1"], &["beta", "2"]])
            ),
        ]
    );
    assert_eq!(report.summary.cycle, 1);
    assert_eq!(report.summary.header_count, 2);
    assert_eq!(report.summary.row_count, 2);
    assert_eq!(report.next_delay, Duration::from_secs(5));
    assert_eq!(cycle.state().phase(), Phase::Waiting);

    assert_eq!(
        sheets.get_values("Page1!A2:B").await.unwrap(),
        strings(&[&["alpha", "1"], &["beta", "2"]])
    );
}

#[tokio::test]
async fn odd_cell_count_drops_trailing_cell() {
    let page = r#"<div class="table-wrap"><table><tr><td>a</td><td>1</td><td>orphan</td></tr></table></div>"#;
    let sheets = Arc::new(RecordingSheets::default());
    let mut cycle = cycle(ScriptedFetcher::page(page), sheets.clone(), Duration::ZERO);

    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.summary.row_count, 1);
    assert_eq!(report.summary.dropped_cells, 1);
    assert_eq!(
        sheets.writes(),
        vec![
            ("Page1!A1:B".to_string(), vec![Vec::<String>::new()]),
            ("Page1!A2:B".to_string(), strings(&[&["a", "1"]])),
        ]
    );
}

#[tokio::test]
async fn fetch_failure_stops_before_any_write() {
    init_logging();
    let sheets = Arc::new(RecordingSheets::default());
    let mut cycle = cycle(
        ScriptedFetcher::new(vec![Err(network_down())]),
        sheets.clone(),
        Duration::ZERO,
    );

    let err = Scheduler::default().run(&mut cycle).await.unwrap_err();

    assert!(matches!(err, SyncError::Fetch(_)));
    assert_eq!(err.step(), Some(SyncStep::Fetch));
    assert!(sheets.writes().is_empty());
    assert_eq!(cycle.state().phase(), Phase::Failed);
    assert_eq!(cycle.state().failed_step(), Some(SyncStep::Fetch));
}

#[tokio::test]
async fn missing_container_is_an_extract_failure() {
    let sheets = Arc::new(RecordingSheets::default());
    let mut cycle = cycle(
        ScriptedFetcher::page("<html><body>maintenance</body></html>"),
        sheets.clone(),
        Duration::ZERO,
    );

    let err = cycle.run_once().await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::Parse(ParseError::MissingOpenMarker { .. })
    ));
    assert_eq!(err.step(), Some(SyncStep::Extract));
    assert!(sheets.writes().is_empty());
}

#[tokio::test]
async fn rejected_header_write_skips_body() {
    let sheets = Arc::new(RecordingSheets::rejecting("Page1!A1:B"));
    let mut cycle = cycle(ScriptedFetcher::page(PAGE), sheets.clone(), Duration::ZERO);

    let err = cycle.run_once().await.unwrap_err();

    assert_eq!(err.step(), Some(SyncStep::PublishHeaders));
    assert!(sheets.writes().is_empty());
    assert_eq!(cycle.state().failed_step(), Some(SyncStep::PublishHeaders));
}

#[tokio::test]
async fn rejected_body_write_reports_body_step() {
    let sheets = Arc::new(RecordingSheets::rejecting("Page1!A2:B"));
    let mut cycle = cycle(ScriptedFetcher::page(PAGE), sheets.clone(), Duration::ZERO);

    let err = cycle.run_once().await.unwrap_err();

    assert_eq!(err.step(), Some(SyncStep::PublishBody));
    assert_eq!(sheets.writes().len(), 1);
    assert!(err.to_string().contains("PERMISSION_DENIED"));
}

#[tokio::test]
async fn scheduler_repeats_cycles_until_limit() {
    let sheets = Arc::new(RecordingSheets::default());
    let mut cycle = cycle(ScriptedFetcher::page(PAGE), sheets.clone(), Duration::ZERO);

    let summary = Scheduler::default()
        .with_max_cycles(3)
        .run(&mut cycle)
        .await
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            cycles_attempted: 3,
            cycles_completed: 3
        }
    );
    assert_eq!(sheets.writes().len(), 6);
    assert_eq!(cycle.state().cycle(), 3);
}

/// Retries until three failures in a row.
struct RetryUpToThree;

impl Supervisor for RetryUpToThree {
    fn on_failure(&mut self, _error: &SyncError, consecutive_failures: u32) -> Decision {
        if consecutive_failures < 3 {
            Decision::Retry
        } else {
            Decision::Abort
        }
    }
}

#[tokio::test]
async fn retrying_supervisor_recovers_on_next_cycle() {
    init_logging();
    let sheets = Arc::new(RecordingSheets::default());
    let fetcher = ScriptedFetcher::new(vec![
        Err(network_down()),
        Err(network_down()),
        Ok(PAGE.to_string()),
    ]);
    let mut cycle = cycle(fetcher, sheets.clone(), Duration::ZERO);
    let mut scheduler = Scheduler::new(RetryUpToThree).with_max_cycles(4);

    let summary = scheduler.run(&mut cycle).await.unwrap();

    assert_eq!(summary.cycles_attempted, 4);
    assert_eq!(summary.cycles_completed, 2);
    assert_eq!(sheets.writes().len(), 4);
    assert_eq!(cycle.state().phase(), Phase::Waiting);
}
