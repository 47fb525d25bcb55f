use crate::{JobId, Millis, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the input line.
    InputChanged(String),
    /// User submitted the current input as a new job.
    InputSubmitted { at: Millis },
    /// Scheduler tick; may hand the oldest pending job to the driver.
    Tick { at: Millis },
    /// Driver entered a new stage for the in-flight job.
    JobProgress {
        job_id: JobId,
        stage: Stage,
        at: Millis,
    },
    /// Summarizer answered for the in-flight job.
    SummaryReceived {
        job_id: JobId,
        bytes: usize,
        at: Millis,
    },
    /// Driver finished the in-flight job, one way or the other.
    JobDone {
        job_id: JobId,
        result: JobResult,
        at: Millis,
    },
    /// Leaves state untouched and emits nothing.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Success { summary: String, duration_ms: u64 },
    Failed { reason: String },
}
