use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use stackflow_core::{Effect, JobResult, Millis, Msg};
use stackflow_engine::{EngineEvent, EngineHandle, JobProgress};
use stackflow_logging::{flow_info, flow_warn};

use super::app::AppInput;

/// How long the event pump blocks before checking that the app still listens.
const PUMP_POLL: Duration = Duration::from_millis(200);

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, app_tx: mpsc::Sender<AppInput>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_pump(app_tx);
        runner
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RunJob { job_id, input } => {
                    flow_info!("RunJob job_id={} input_len={}", job_id, input.len());
                    self.engine.run(job_id, input);
                }
            }
        }
    }

    fn spawn_event_pump(&self, app_tx: mpsc::Sender<AppInput>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            let Some(event) = engine.recv_timeout(PUMP_POLL) else {
                continue;
            };
            if app_tx.send(AppInput::Msg(event_to_msg(event, now_ms()))).is_err() {
                break;
            }
        });
    }
}

pub fn now_ms() -> Millis {
    Utc::now().timestamp_millis()
}

fn event_to_msg(event: EngineEvent, at: Millis) -> Msg {
    match event {
        EngineEvent::Progress(JobProgress { job_id, stage }) => Msg::JobProgress { job_id, stage, at },
        EngineEvent::SummaryReceived { job_id, bytes } => Msg::SummaryReceived { job_id, bytes, at },
        EngineEvent::JobCompleted { job_id, result } => Msg::JobDone {
            job_id,
            result: match result {
                Ok(report) => JobResult::Success {
                    summary: report.summary,
                    duration_ms: report.duration_ms,
                },
                Err(failure) => {
                    flow_warn!("Job {} failed: {}", job_id, failure);
                    JobResult::Failed {
                        reason: failure.to_string(),
                    }
                }
            },
            at,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_core::Stage;
    use stackflow_engine::{FailureKind, JobFailure, JobReport};

    #[test]
    fn completed_report_becomes_success() {
        let msg = event_to_msg(
            EngineEvent::JobCompleted {
                job_id: 3,
                result: Ok(JobReport {
                    summary: "## Summary".to_string(),
                    duration_ms: 3600,
                }),
            },
            42,
        );
        assert_eq!(
            msg,
            Msg::JobDone {
                job_id: 3,
                result: JobResult::Success {
                    summary: "## Summary".to_string(),
                    duration_ms: 3600,
                },
                at: 42,
            }
        );
    }

    #[test]
    fn failure_keeps_its_text() {
        let failure = JobFailure {
            kind: FailureKind::HttpStatus(500),
            message: "service returned 500: down".to_string(),
        };
        let msg = event_to_msg(
            EngineEvent::JobCompleted {
                job_id: 1,
                result: Err(failure.clone()),
            },
            7,
        );
        assert_eq!(
            msg,
            Msg::JobDone {
                job_id: 1,
                result: JobResult::Failed {
                    reason: failure.to_string(),
                },
                at: 7,
            }
        );
    }

    #[test]
    fn progress_maps_stage() {
        let msg = event_to_msg(
            EngineEvent::Progress(JobProgress {
                job_id: 2,
                stage: Stage::Saving,
            }),
            1,
        );
        assert_eq!(
            msg,
            Msg::JobProgress {
                job_id: 2,
                stage: Stage::Saving,
                at: 1,
            }
        );
    }
}
