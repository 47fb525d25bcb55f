//! StackFlow engine: stage driver execution and the summarizer client.
mod driver;
mod engine;
mod summarize;
mod types;

pub use driver::{run_job, DriverSettings, FlightGuard, FlightSlot, StageDriver};
pub use engine::EngineHandle;
pub use summarize::{
    build_prompt, GeminiSummarizer, SummarizeError, Summarizer, SummarizerSettings,
    API_KEY_ENV, EMPTY_RESPONSE_PLACEHOLDER,
};
pub use types::{
    ChannelEventSink, EngineEvent, EventSink, FailureKind, JobFailure, JobId, JobProgress,
    JobReport, Stage,
};
