use crate::{ActiveStage, HistorySample, InputKind, JobId, JobStatus, LogEntry, Millis, Stage};

/// Figures derived from state on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    pub completed_jobs: usize,
    pub avg_processing_ms: u64,
    pub queue_depth: usize,
    /// Percentage of all jobs that completed; 100 before any job exists.
    pub success_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub input: String,
    pub active_stage: ActiveStage,
    pub in_flight: Option<JobId>,
    pub jobs: Vec<JobRowView>,
    /// Result of the most recently submitted completed job.
    pub latest_result: Option<String>,
    pub logs: Vec<LogEntry>,
    pub history: Vec<HistorySample>,
    pub stats: PipelineStats,
    pub credential_missing: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub input: String,
    pub kind: InputKind,
    pub status: JobStatus,
    pub stage: Stage,
    pub created_at: Millis,
}
