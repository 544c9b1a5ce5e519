use crate::{extract_table, CycleSummary, DriverState, Effect, Msg, Phase, SyncStep};

/// Pure update function: applies a message to state and returns any effects.
/// Messages that make no sense in the current phase are ignored.
pub fn update(mut state: DriverState, msg: Msg) -> (DriverState, Vec<Effect>) {
    let effects = match msg {
        Msg::CycleStarted => match state.phase() {
            Phase::Idle | Phase::Waiting | Phase::Failed => {
                state.begin_cycle();
                vec![Effect::FetchDocument]
            }
            Phase::Fetching | Phase::Publishing => Vec::new(),
        },
        Msg::DocumentFetched(html) => {
            if state.phase() != Phase::Fetching {
                return (state, Vec::new());
            }
            match extract_table(&html, state.settings()) {
                Ok(extracted) => {
                    let summary = CycleSummary {
                        cycle: state.cycle(),
                        header_count: extracted.headers.len(),
                        row_count: extracted.table.len(),
                        dropped_cells: extracted.table.dropped_cells(),
                    };
                    state.begin_publishing(summary, extracted.table);
                    vec![Effect::PublishHeaders(extracted.headers)]
                }
                Err(err) => {
                    state.fail(SyncStep::Extract);
                    vec![Effect::RejectDocument(err)]
                }
            }
        }
        Msg::HeadersPublished => {
            if state.phase() != Phase::Publishing {
                return (state, Vec::new());
            }
            match state.take_pending_body() {
                Some(body) => vec![Effect::PublishBody(body)],
                None => Vec::new(),
            }
        }
        Msg::BodyPublished => {
            // Only valid once the body has been handed out.
            if state.phase() == Phase::Publishing && !state.has_pending_body() {
                state.finish_cycle();
                vec![Effect::Sleep(state.interval())]
            } else {
                Vec::new()
            }
        }
        Msg::StepFailed(step) => match state.phase() {
            Phase::Fetching | Phase::Publishing => {
                state.fail(step);
                Vec::new()
            }
            Phase::Idle | Phase::Waiting | Phase::Failed => Vec::new(),
        },
    };

    (state, effects)
}
