//! StackFlow core: pure pipeline state machine and view-model helpers.
//!
//! Nothing in this crate performs IO or reads a clock. Time enters through
//! the `at` field of each [`Msg`], and side effects leave as [`Effect`]s.
mod effect;
mod history;
mod lifecycle;
mod log_sink;
mod msg;
mod state;
mod store;
mod update;
mod view_model;

pub use effect::Effect;
pub use history::{HistoryBuffer, HistorySample, HISTORY_CAPACITY};
pub use lifecycle::{advance, Outcome, Phase, Step};
pub use log_sink::{LogEntry, LogKind, LogSink, LogSource, LOG_CAPACITY};
pub use msg::{JobResult, Msg};
pub use state::{
    classify_input, ActiveStage, AppState, InputKind, Job, JobId, JobStatus, Millis, Stage,
};
pub use store::JobStore;
pub use update::update;
pub use view_model::{AppViewModel, JobRowView, PipelineStats};
