use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use log::LevelFilter;
use stackflow_core::{update, AppState, JobStatus, Msg};
use stackflow_engine::EngineHandle;
use stackflow_logging::{flow_info, flow_warn};

use super::config::{AppConfig, DEFAULT_CONFIG_FILE};
use super::effects::{now_ms, EffectRunner};
use super::ui;

/// Everything the dispatch loop reacts to.
pub enum AppInput {
    Msg(Msg),
    /// Stdin reached end of file; no further submissions will arrive.
    InputClosed,
}

pub fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load(&config_path)?;
    stackflow_logging::initialize(config.log_destination, LevelFilter::Info);
    flow_info!("Starting with config {:?}: {:?}", config_path, config);

    let summarizer = config.summarizer_settings();
    let mut state = AppState::new();
    if !summarizer.has_credential() {
        flow_warn!("API_KEY is not set; submissions are disabled");
        state = state.with_missing_credential();
    }

    let engine = EngineHandle::with_gemini(summarizer, config.driver_settings())
        .context("starting engine")?;

    let (app_tx, app_rx) = mpsc::channel::<AppInput>();
    let runner = EffectRunner::new(engine, app_tx.clone());
    spawn_ticker(app_tx.clone(), config.tick_interval());
    spawn_stdin_reader(app_tx);

    let mut out = io::stdout();
    let clear = out.is_terminal();
    draw(&mut out, &state, clear)?;

    let mut input_closed = false;
    while let Ok(input) = app_rx.recv() {
        match input {
            AppInput::Msg(msg) => {
                let (next, effects) = update(std::mem::take(&mut state), msg);
                state = next;
                runner.run(effects);
                if state.consume_dirty() {
                    draw(&mut out, &state, clear)?;
                }
            }
            AppInput::InputClosed => input_closed = true,
        }
        if input_closed && is_drained(&state) {
            flow_info!("Input closed and no work left; exiting");
            break;
        }
    }
    Ok(())
}

/// No job is waiting or running.
fn is_drained(state: &AppState) -> bool {
    state.in_flight().is_none()
        && !state
            .jobs()
            .iter()
            .any(|job| matches!(job.status, JobStatus::Pending | JobStatus::Processing))
}

fn draw(out: &mut impl Write, state: &AppState, clear: bool) -> io::Result<()> {
    let view = state.view();
    if clear {
        write!(out, "{}", ui::constants::CLEAR)?;
    }
    write!(out, "{}", ui::render::render(&view))?;
    out.flush()
}

// Drives the scheduler: one tick per interval, for the life of the app.
fn spawn_ticker(app_tx: mpsc::Sender<AppInput>, interval: std::time::Duration) {
    thread::spawn(move || {
        while app_tx
            .send(AppInput::Msg(Msg::Tick { at: now_ms() }))
            .is_ok()
        {
            thread::sleep(interval);
        }
    });
}

fn spawn_stdin_reader(app_tx: mpsc::Sender<AppInput>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        forward_submissions(stdin.lock(), &app_tx);
    });
}

/// Sends one submission per line until end of input, then `InputClosed`.
/// Lines that are not valid UTF-8 are decoded lossily rather than ending intake.
fn forward_submissions(mut reader: impl BufRead, app_tx: &mpsc::Sender<AppInput>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                flow_warn!("Reading stdin failed: {}", err);
                break;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        let sent = app_tx.send(AppInput::Msg(Msg::InputChanged(line))).is_ok()
            && app_tx
                .send(AppInput::Msg(Msg::InputSubmitted { at: now_ms() }))
                .is_ok();
        if !sent {
            return;
        }
    }
    let _ = app_tx.send(AppInput::InputClosed);
}
