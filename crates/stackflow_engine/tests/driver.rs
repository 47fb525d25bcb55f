use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use stackflow_engine::{
    run_job, DriverSettings, EngineEvent, EventSink, FailureKind, JobProgress, SummarizeError,
    Summarizer, StageDriver, Stage,
};

const DELAY: Duration = Duration::from_millis(1200);

#[derive(Default, Clone)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

enum Reply {
    Text(&'static str),
    Fail,
    Hang,
    Panic,
}

struct StubSummarizer {
    reply: Reply,
    calls: Mutex<Vec<String>>,
}

impl StubSummarizer {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, input: &str) -> Result<String, SummarizeError> {
        self.calls.lock().unwrap().push(input.to_string());
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail => Err(SummarizeError::Api {
                status: 500,
                message: "backend unavailable".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
            Reply::Panic => panic!("summarizer exploded"),
        }
    }
}

fn settings() -> DriverSettings {
    DriverSettings {
        stage_delay: DELAY,
        analysis_timeout: None,
    }
}

fn stages(events: &[EngineEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(JobProgress { stage, .. }) => Some(*stage),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn successful_job_visits_each_stage_and_takes_three_delays() {
    let summarizer = StubSummarizer::new(Reply::Text("## Summary\n..."));
    let sink = TestSink::default();

    let report = run_job(1, "https://example.com", &summarizer, &settings(), &sink)
        .await
        .expect("job succeeds");

    assert_eq!(report.summary, "## Summary\n...");
    assert!(report.duration_ms >= 3 * DELAY.as_millis() as u64);
    assert_eq!(
        *summarizer.calls.lock().unwrap(),
        vec!["https://example.com".to_string()]
    );

    let events = sink.take();
    assert_eq!(
        stages(&events),
        vec![Stage::Scraping, Stage::AiAnalysis, Stage::Saving]
    );
    // The summary arrives between entering analysis and entering saving.
    assert_eq!(
        events[2],
        EngineEvent::SummaryReceived {
            job_id: 1,
            bytes: "## Summary\n...".len(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn summarizer_error_fails_job_and_skips_saving() {
    let summarizer = StubSummarizer::new(Reply::Fail);
    let sink = TestSink::default();

    let failure = run_job(4, "topic", &summarizer, &settings(), &sink)
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::HttpStatus(500));
    assert!(failure.message.contains("backend unavailable"));
    let events = sink.take();
    assert_eq!(stages(&events), vec![Stage::Scraping, Stage::AiAnalysis]);
    assert!(!events
        .iter()
        .any(|event| matches!(event, EngineEvent::SummaryReceived { .. })));
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_bounds_the_summarizer() {
    let summarizer = StubSummarizer::new(Reply::Hang);
    let sink = TestSink::default();
    let settings = DriverSettings {
        analysis_timeout: Some(Duration::from_secs(30)),
        ..settings()
    };

    let failure = run_job(2, "topic", &summarizer, &settings, &sink)
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn without_timeout_a_hung_call_holds_the_pipeline() {
    let driver = Arc::new(StageDriver::new(
        Arc::new(StubSummarizer::new(Reply::Hang)),
        settings(),
        Arc::new(TestSink::default()),
    ));

    let task = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.drive(1, "topic".to_string()).await })
    };
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(driver.slot().current(), Some(1));
    assert!(driver.slot().try_acquire(2).is_none());
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn drive_reports_completion_and_frees_the_slot() {
    let sink = TestSink::default();
    let driver = StageDriver::new(
        Arc::new(StubSummarizer::new(Reply::Text("done"))),
        settings(),
        Arc::new(sink.clone()),
    );

    driver.drive(9, "topic".to_string()).await;

    assert_eq!(driver.slot().current(), None);
    let events = sink.take();
    let completions: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::JobCompleted { job_id, result } => Some((*job_id, result.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].0, 9);
    assert_eq!(completions[0].1.as_ref().unwrap().summary, "done");
}

#[tokio::test(start_paused = true)]
async fn failed_drive_still_frees_the_slot() {
    let sink = TestSink::default();
    let driver = StageDriver::new(
        Arc::new(StubSummarizer::new(Reply::Fail)),
        settings(),
        Arc::new(sink.clone()),
    );

    driver.drive(3, "topic".to_string()).await;

    assert_eq!(driver.slot().current(), None);
    assert!(driver.slot().try_acquire(4).is_some());
    let last = sink.take().pop().unwrap();
    assert!(matches!(
        last,
        EngineEvent::JobCompleted {
            job_id: 3,
            result: Err(_)
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn panicking_summarizer_reports_aborted_and_frees_the_slot() {
    let sink = TestSink::default();
    let driver = Arc::new(StageDriver::new(
        Arc::new(StubSummarizer::new(Reply::Panic)),
        settings(),
        Arc::new(sink.clone()),
    ));

    let task = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.drive(5, "topic".to_string()).await })
    };
    assert!(task.await.is_err());

    assert_eq!(driver.slot().current(), None);
    let last = sink.take().pop().unwrap();
    match last {
        EngineEvent::JobCompleted {
            job_id,
            result: Err(failure),
        } => {
            assert_eq!(job_id, 5);
            assert_eq!(failure.kind, FailureKind::Aborted);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_drives_run_one_after_another() {
    let sink = TestSink::default();
    let driver = Arc::new(StageDriver::new(
        Arc::new(StubSummarizer::new(Reply::Text("ok"))),
        settings(),
        Arc::new(sink.clone()),
    ));

    let first = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.drive(1, "a".to_string()).await })
    };
    tokio::task::yield_now().await;
    let second = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.drive(2, "b".to_string()).await })
    };
    first.await.unwrap();
    second.await.unwrap();

    let order: Vec<_> = sink
        .take()
        .into_iter()
        .map(|event| match event {
            EngineEvent::Progress(JobProgress { job_id, .. }) => ("progress", job_id),
            EngineEvent::SummaryReceived { job_id, .. } => ("summary", job_id),
            EngineEvent::JobCompleted { job_id, .. } => ("completed", job_id),
        })
        .collect();
    let first_done = order
        .iter()
        .position(|event| *event == ("completed", 1))
        .unwrap();
    assert!(order[..first_done].iter().all(|(_, id)| *id == 1));
    assert!(order[first_done + 1..].iter().all(|(_, id)| *id == 2));
    assert_eq!(order.last(), Some(&("completed", 2)));
}
