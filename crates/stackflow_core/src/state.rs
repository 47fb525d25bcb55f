use std::fmt;

use crate::history::{HistoryBuffer, HistorySample};
use crate::lifecycle::{Phase, Step};
use crate::log_sink::{LogKind, LogSink, LogSource};
use crate::store::JobStore;
use crate::view_model::{AppViewModel, JobRowView, PipelineStats};

pub type JobId = u64;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Per-job pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Queued,
    Scraping,
    AiAnalysis,
    Saving,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Queued => write!(f, "QUEUED"),
            Stage::Scraping => write!(f, "SCRAPING"),
            Stage::AiAnalysis => write!(f, "AI"),
            Stage::Saving => write!(f, "SAVING"),
            Stage::Done => write!(f, "DONE"),
        }
    }
}

/// Global display state: which stage the pipeline is animating, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveStage {
    #[default]
    Idle,
    Stage(Stage),
}

impl fmt::Display for ActiveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveStage::Idle => write!(f, "IDLE"),
            ActiveStage::Stage(stage) => stage.fmt(f),
        }
    }
}

/// What the user typed: a page to look up or a topic to research.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Url,
    Topic,
}

/// Classify raw input. Only absolute `http`/`https` URLs count as URLs.
pub fn classify_input(raw: &str) -> InputKind {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            InputKind::Url
        }
        _ => InputKind::Topic,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub input: String,
    pub kind: InputKind,
    pub status: JobStatus,
    pub stage: Stage,
    pub result: Option<String>,
    /// Failure detail. Kept off the result panel; only the job record holds it.
    pub error: Option<String>,
    pub created_at: Millis,
    pub completed_at: Option<Millis>,
}

impl Job {
    pub(crate) fn new(id: JobId, input: String, created_at: Millis) -> Self {
        let kind = classify_input(&input);
        Self {
            id,
            input,
            kind,
            status: JobStatus::Pending,
            stage: Stage::Queued,
            result: None,
            error: None,
            created_at,
            completed_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_record(self.status, self.stage)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    jobs: JobStore,
    logs: LogSink,
    history: HistoryBuffer,
    in_flight: Option<JobId>,
    active_stage: ActiveStage,
    credential_missing: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a process started without a summarizer credential.
    /// Submission stays disabled for the lifetime of the state.
    pub fn with_missing_credential(mut self) -> Self {
        self.credential_missing = true;
        self
    }

    pub fn credential_missing(&self) -> bool {
        self.credential_missing
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn logs(&self) -> &LogSink {
        &self.logs
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn in_flight(&self) -> Option<JobId> {
        self.in_flight
    }

    pub fn active_stage(&self) -> ActiveStage {
        self.active_stage
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn stats(&self) -> PipelineStats {
        let total = self.jobs.len();
        let completed = self.jobs.count_with_status(JobStatus::Completed);
        let pending = self.jobs.count_with_status(JobStatus::Pending);
        let success_rate = if total == 0 {
            100
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        PipelineStats {
            completed_jobs: completed,
            avg_processing_ms: self.history.average_duration_ms(),
            queue_depth: pending,
            success_rate,
        }
    }

    pub fn view(&self) -> AppViewModel {
        let jobs = self
            .jobs
            .iter()
            .map(|job| JobRowView {
                job_id: job.id,
                input: job.input.clone(),
                kind: job.kind,
                status: job.status,
                stage: job.stage,
                created_at: job.created_at,
            })
            .collect();
        let latest_result = self
            .jobs
            .iter()
            .rev()
            .find(|job| job.status == JobStatus::Completed)
            .and_then(|job| job.result.clone());

        AppViewModel {
            input: self.input.clone(),
            active_stage: self.active_stage,
            in_flight: self.in_flight,
            jobs,
            latest_result,
            logs: self.logs.iter().cloned().collect(),
            history: self.history.iter().cloned().collect::<Vec<HistorySample>>(),
            stats: self.stats(),
            credential_missing: self.credential_missing,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.dirty = true;
        }
    }

    /// Turns the current input into a job. Blank input and a missing
    /// credential both leave the state untouched.
    pub(crate) fn submit_input(&mut self, at: Millis) -> Option<JobId> {
        if self.credential_missing {
            return None;
        }
        let job_id = self.jobs.submit(&self.input, at)?;
        self.input.clear();
        self.logs.push(
            at,
            LogSource::Job(job_id),
            "Received API request POST /jobs",
            LogKind::Info,
        );
        self.dirty = true;
        Some(job_id)
    }

    /// Claims the in-flight slot for the oldest pending job and moves it into
    /// the queue stage. Returns the claimed job and its input.
    pub(crate) fn claim_next_pending(&mut self, at: Millis) -> Option<(JobId, String)> {
        if self.in_flight.is_some() {
            return None;
        }
        let (job_id, input) = match self.jobs.first_pending() {
            Some(job) => (job.id, job.input.clone()),
            None => {
                self.set_active_stage(ActiveStage::Idle);
                return None;
            }
        };

        let phase = Phase::Pending.advance(Step::Proceed);
        self.jobs.transition(job_id, phase.status(), phase.stage());
        self.in_flight = Some(job_id);
        self.set_active_stage(ActiveStage::Stage(phase.stage()));
        self.logs.push(
            at,
            LogSource::Job(job_id),
            format!("Job #{job_id} picked up from queue: \"default\""),
            LogKind::System,
        );
        self.dirty = true;
        Some((job_id, input))
    }

    pub(crate) fn apply_progress(&mut self, job_id: JobId, stage: Stage, at: Millis) {
        if self.in_flight != Some(job_id) {
            return;
        }
        if !self.jobs.transition(job_id, JobStatus::Processing, stage) {
            return;
        }
        self.set_active_stage(ActiveStage::Stage(stage));
        let entry = match stage {
            Stage::Queued | Stage::Done => None,
            Stage::Scraping => Some(("Worker 01 executing scraper: Readability", LogKind::Info)),
            Stage::AiAnalysis => Some(("Sending payload to summarizer...", LogKind::Info)),
            Stage::Saving => Some((
                "Writing document to collection: \"summaries\"",
                LogKind::System,
            )),
        };
        if let Some((message, kind)) = entry {
            self.logs.push(at, LogSource::Job(job_id), message, kind);
        }
        self.dirty = true;
    }

    pub(crate) fn apply_summary_received(&mut self, job_id: JobId, bytes: usize, at: Millis) {
        if self.in_flight != Some(job_id) {
            return;
        }
        self.logs.push(
            at,
            LogSource::Job(job_id),
            format!("Summarizer response received ({bytes} bytes)"),
            LogKind::Success,
        );
        self.dirty = true;
    }

    pub(crate) fn apply_completed(
        &mut self,
        job_id: JobId,
        summary: String,
        duration_ms: u64,
        at: Millis,
    ) {
        if self.jobs.complete(job_id, summary, at) {
            self.history.push(at, duration_ms);
            self.logs.push(
                at,
                LogSource::Job(job_id),
                format!("Job #{job_id} completed in {duration_ms}ms"),
                LogKind::Success,
            );
        }
        self.release(job_id);
    }

    pub(crate) fn apply_failed(&mut self, job_id: JobId, reason: String, at: Millis) {
        let detail = format!("AI inference failed: {reason}");
        if self.jobs.fail(job_id, reason) {
            // Detail first; the error-kind entry stays the only one per failure.
            self.logs.push(at, LogSource::Job(job_id), detail, LogKind::System);
            self.logs.push(
                at,
                LogSource::Job(job_id),
                "Job failed processing",
                LogKind::Error,
            );
        }
        self.release(job_id);
    }

    fn release(&mut self, job_id: JobId) {
        if self.in_flight == Some(job_id) {
            self.in_flight = None;
        }
        self.dirty = true;
    }

    fn set_active_stage(&mut self, stage: ActiveStage) {
        if self.active_stage != stage {
            self.active_stage = stage;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_topics_are_told_apart() {
        assert_eq!(classify_input("https://example.com"), InputKind::Url);
        assert_eq!(classify_input("  http://example.com/a?b=c  "), InputKind::Url);
        assert_eq!(classify_input("rust async runtimes"), InputKind::Topic);
        assert_eq!(classify_input("mailto:someone@example.com"), InputKind::Topic);
        assert_eq!(classify_input("example.com"), InputKind::Topic);
    }

    #[test]
    fn success_rate_is_full_without_jobs() {
        let state = AppState::new();
        let stats = state.stats();
        assert_eq!(stats.success_rate, 100);
        assert_eq!(stats.avg_processing_ms, 0);
        assert_eq!(stats.queue_depth, 0);
    }

    #[test]
    fn missing_credential_blocks_submission() {
        let mut state = AppState::new().with_missing_credential();
        state.set_input("https://example.com".to_string());
        assert_eq!(state.submit_input(0), None);
        assert!(state.jobs().is_empty());
        assert!(state.logs().is_empty());
    }
}
