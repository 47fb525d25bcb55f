use std::io;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use stackflow_logging::{flow_debug, flow_info};

use crate::driver::{DriverSettings, FlightSlot, StageDriver};
use crate::summarize::{GeminiSummarizer, SummarizeError, Summarizer, SummarizerSettings};
use crate::types::{ChannelEventSink, EngineEvent, JobId};

enum EngineCommand {
    Run { job_id: JobId, input: String },
}

/// Handle to the engine thread. The thread owns a tokio runtime and runs
/// each submitted job on the [`StageDriver`]; events come back on a channel.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    slot: FlightSlot,
}

impl EngineHandle {
    pub fn new(summarizer: Arc<dyn Summarizer>, settings: DriverSettings) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let sink = Arc::new(ChannelEventSink::new(event_tx));
        let driver = Arc::new(StageDriver::new(summarizer, settings, sink));
        let slot = driver.slot().clone();

        thread::Builder::new()
            .name("stackflow-engine".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let driver = driver.clone();
                    runtime.spawn(async move {
                        handle_command(&driver, command).await;
                    });
                }
                flow_info!("Engine command channel closed; shutting down");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            slot,
        })
    }

    /// Engine backed by the Gemini client.
    pub fn with_gemini(
        summarizer: SummarizerSettings,
        settings: DriverSettings,
    ) -> Result<Self, SummarizeError> {
        let summarizer = Arc::new(GeminiSummarizer::new(summarizer)?);
        Self::new(summarizer, settings).map_err(|err| SummarizeError::Client(err.to_string()))
    }

    pub fn run(&self, job_id: JobId, input: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Run {
            job_id,
            input: input.into(),
        });
    }

    /// Job currently holding the pipeline, if any.
    pub fn in_flight(&self) -> Option<JobId> {
        self.slot.current()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(timeout)
            .ok()
    }
}

async fn handle_command(driver: &StageDriver, command: EngineCommand) {
    match command {
        EngineCommand::Run { job_id, input } => {
            flow_debug!("Run job_id={} input_len={}", job_id, input.len());
            driver.drive(job_id, input).await;
        }
    }
}
