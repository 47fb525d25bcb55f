use crate::{AppState, Effect, JobResult, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::InputSubmitted { at } => {
            state.submit_input(at);
            Vec::new()
        }
        Msg::Tick { at } => match state.claim_next_pending(at) {
            Some((job_id, input)) => vec![Effect::RunJob { job_id, input }],
            None => Vec::new(),
        },
        Msg::JobProgress { job_id, stage, at } => {
            state.apply_progress(job_id, stage, at);
            Vec::new()
        }
        Msg::SummaryReceived { job_id, bytes, at } => {
            state.apply_summary_received(job_id, bytes, at);
            Vec::new()
        }
        Msg::JobDone { job_id, result, at } => {
            match result {
                JobResult::Success {
                    summary,
                    duration_ms,
                } => state.apply_completed(job_id, summary, duration_ms, at),
                JobResult::Failed { reason } => state.apply_failed(job_id, reason, at),
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
