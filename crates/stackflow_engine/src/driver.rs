use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use stackflow_core::{Outcome, Phase, Step};
use stackflow_logging::{flow_error, flow_info, flow_warn};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::summarize::{SummarizeError, Summarizer};
use crate::types::{
    EngineEvent, EventSink, FailureKind, JobFailure, JobId, JobProgress, JobReport,
};

#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Pause spent in each simulated stage (queue, scrape, save).
    pub stage_delay: Duration,
    /// Upper bound on the summarizer call. `None` waits indefinitely.
    pub analysis_timeout: Option<Duration>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            stage_delay: Duration::from_millis(1200),
            analysis_timeout: None,
        }
    }
}

/// Single-slot ownership of the pipeline. At most one [`FlightGuard`] exists
/// at a time; dropping it frees the slot.
#[derive(Debug, Clone)]
pub struct FlightSlot {
    permit: Arc<Semaphore>,
    current: Arc<Mutex<Option<JobId>>>,
}

impl Default for FlightSlot {
    fn default() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
            current: Arc::new(Mutex::new(None)),
        }
    }
}

impl FlightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Job currently holding the slot.
    pub fn current(&self) -> Option<JobId> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn try_acquire(&self, job_id: JobId) -> Option<FlightGuard> {
        let permit = self.permit.clone().try_acquire_owned().ok()?;
        Some(self.hold(job_id, permit))
    }

    /// Waits for the slot. Waiters are served in arrival order.
    pub async fn acquire(&self, job_id: JobId) -> Option<FlightGuard> {
        let permit = self.permit.clone().acquire_owned().await.ok()?;
        Some(self.hold(job_id, permit))
    }

    fn hold(&self, job_id: JobId, permit: OwnedSemaphorePermit) -> FlightGuard {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(job_id);
        FlightGuard {
            job_id,
            current: self.current.clone(),
            _permit: permit,
        }
    }
}

#[derive(Debug)]
pub struct FlightGuard {
    job_id: JobId,
    current: Arc<Mutex<Option<JobId>>>,
    _permit: OwnedSemaphorePermit,
}

impl FlightGuard {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == Some(self.job_id) {
            *current = None;
        }
    }
}

/// Sends exactly one `JobCompleted` per job. If the driver unwinds or is
/// dropped before finishing, the job is reported as aborted.
struct CompletionReport<'a> {
    job_id: JobId,
    sink: &'a dyn EventSink,
    sent: bool,
}

impl<'a> CompletionReport<'a> {
    fn new(job_id: JobId, sink: &'a dyn EventSink) -> Self {
        Self {
            job_id,
            sink,
            sent: false,
        }
    }

    fn send(mut self, result: Result<JobReport, JobFailure>) {
        self.sent = true;
        self.sink.emit(EngineEvent::JobCompleted {
            job_id: self.job_id,
            result,
        });
    }
}

impl Drop for CompletionReport<'_> {
    fn drop(&mut self) {
        if !self.sent {
            flow_error!("Job {} stopped before reporting an outcome", self.job_id);
            self.sink.emit(EngineEvent::JobCompleted {
                job_id: self.job_id,
                result: Err(JobFailure::new(
                    FailureKind::Aborted,
                    "driver stopped before the job finished",
                )),
            });
        }
    }
}

/// Executes claimed jobs one at a time and reports their events.
pub struct StageDriver {
    summarizer: Arc<dyn Summarizer>,
    settings: DriverSettings,
    slot: FlightSlot,
    sink: Arc<dyn EventSink>,
}

impl StageDriver {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        settings: DriverSettings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            summarizer,
            settings,
            slot: FlightSlot::new(),
            sink,
        }
    }

    pub fn slot(&self) -> &FlightSlot {
        &self.slot
    }

    /// Takes the slot, runs `job_id` from the queue stage to a terminal
    /// state and emits its `JobCompleted`, on every exit path.
    pub async fn drive(&self, job_id: JobId, input: String) {
        let report = CompletionReport::new(job_id, self.sink.as_ref());
        let guard = match self.slot.try_acquire(job_id) {
            Some(guard) => Some(guard),
            None => {
                flow_warn!(
                    "Job {} waiting: job {:?} still holds the pipeline",
                    job_id,
                    self.slot.current()
                );
                self.slot.acquire(job_id).await
            }
        };
        let Some(_guard) = guard else {
            // Dropping the report marks the job aborted.
            return;
        };
        let result = run_job(
            job_id,
            &input,
            self.summarizer.as_ref(),
            &self.settings,
            self.sink.as_ref(),
        )
        .await;
        report.send(result);
    }
}

/// Runs one job through the stage sequence, starting in the queue stage.
///
/// Emits `Progress` on each stage entry after the queue and
/// `SummaryReceived` once the summarizer answers. The terminal outcome is
/// returned, not emitted.
pub async fn run_job(
    job_id: JobId,
    input: &str,
    summarizer: &dyn Summarizer,
    settings: &DriverSettings,
    sink: &dyn EventSink,
) -> Result<JobReport, JobFailure> {
    let started = Instant::now();
    let mut phase = Phase::Queued;
    let mut summary = String::new();
    let mut failure = None;

    while !phase.is_terminal() {
        let step = if phase == Phase::Analyzing {
            match analyze(input, summarizer, settings.analysis_timeout).await {
                Ok(text) => {
                    sink.emit(EngineEvent::SummaryReceived {
                        job_id,
                        bytes: text.len(),
                    });
                    summary = text;
                    Step::Proceed
                }
                Err(err) => {
                    flow_error!("Job {} summarizer failed: {}", job_id, err);
                    failure = Some(JobFailure::from(err));
                    Step::Fail
                }
            }
        } else {
            if phase.is_simulated() {
                tokio::time::sleep(settings.stage_delay).await;
            }
            Step::Proceed
        };

        phase = phase.advance(step);
        if !phase.is_terminal() {
            sink.emit(EngineEvent::Progress(JobProgress {
                job_id,
                stage: phase.stage(),
            }));
        }
    }

    match phase {
        Phase::Done(Outcome::Success) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            flow_info!("Job {} completed in {}ms", job_id, duration_ms);
            Ok(JobReport {
                summary,
                duration_ms,
            })
        }
        _ => Err(failure.unwrap_or_else(|| {
            JobFailure::new(FailureKind::Aborted, "job ended without an outcome")
        })),
    }
}

async fn analyze(
    input: &str,
    summarizer: &dyn Summarizer,
    timeout: Option<Duration>,
) -> Result<String, SummarizeError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, summarizer.summarize(input))
            .await
            .map_err(|_| SummarizeError::Timeout(limit))?,
        None => summarizer.summarize(input).await,
    }
}
