use std::fmt;
use std::sync::mpsc;

pub use stackflow_core::{JobId, Stage};

use crate::summarize::SummarizeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(JobProgress),
    SummaryReceived {
        job_id: JobId,
        bytes: usize,
    },
    JobCompleted {
        job_id: JobId,
        result: Result<JobReport, JobFailure>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub summary: String,
    /// Wall time from pickup to the end of the saving stage.
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<SummarizeError> for JobFailure {
    fn from(err: SummarizeError) -> Self {
        let kind = match &err {
            SummarizeError::MissingCredential => FailureKind::MissingCredential,
            SummarizeError::Client(_) | SummarizeError::Transport(_) => FailureKind::Network,
            SummarizeError::Api { status, .. } => FailureKind::HttpStatus(*status),
            SummarizeError::Decode(_) => FailureKind::InvalidResponse,
            SummarizeError::Timeout(_) => FailureKind::Timeout,
        };
        JobFailure::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    HttpStatus(u16),
    Network,
    InvalidResponse,
    Timeout,
    /// The driver stopped before reporting an outcome.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingCredential => write!(f, "missing credential"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Aborted => write!(f, "aborted"),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
