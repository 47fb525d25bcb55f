//! Terminal front end: wiring between stdin, the core state machine, the
//! engine and the renderer.
mod app;
mod config;
mod effects;
mod ui;

pub use app::run_app;
