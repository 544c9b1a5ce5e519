use crate::SyncStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Scheduler asked for a new cycle.
    CycleStarted,
    /// Source page was fetched and decoded.
    DocumentFetched(String),
    /// Header range was overwritten.
    HeadersPublished,
    /// Body range was overwritten.
    BodyPublished,
    /// A side effect failed; the executor keeps the typed error.
    StepFailed(SyncStep),
}
