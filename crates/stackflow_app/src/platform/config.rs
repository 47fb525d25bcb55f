use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stackflow_engine::{DriverSettings, SummarizerSettings};
use stackflow_logging::LogDestination;
use thiserror::Error;

/// Config file used when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "stackflow.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tick_interval_ms: u64,
    pub stage_delay_ms: u64,
    /// Leave unset to wait for the summarizer indefinitely.
    pub analysis_timeout_ms: Option<u64>,
    pub model: String,
    pub base_url: String,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        let driver = DriverSettings::default();
        let summarizer = SummarizerSettings::default();
        Self {
            tick_interval_ms: 1000,
            stage_delay_ms: driver.stage_delay.as_millis() as u64,
            analysis_timeout_ms: None,
            model: summarizer.model,
            base_url: summarizer.base_url,
            log_destination: LogDestination::File,
        }
    }
}

impl AppConfig {
    /// Reads `path`. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    fn parse(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|err| err.to_string())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            stage_delay: Duration::from_millis(self.stage_delay_ms),
            analysis_timeout: self.analysis_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Summarizer settings with the credential read from the environment.
    pub fn summarizer_settings(&self) -> SummarizerSettings {
        SummarizerSettings {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            ..SummarizerSettings::from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.driver_settings().stage_delay, Duration::from_millis(1200));
        assert_eq!(config.driver_settings().analysis_timeout, None);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stackflow.ron");
        fs::write(
            &path,
            "(stage_delay_ms: 50, analysis_timeout_ms: Some(90000), log_destination: Both)",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.stage_delay_ms, 50);
        assert_eq!(config.log_destination, LogDestination::Both);
        assert_eq!(
            config.driver_settings().analysis_timeout,
            Some(Duration::from_secs(90))
        );
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.model, "gemini-2.5-flash");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.ron");
        fs::write(&path, "(stage_delay_ms: \"soon\")").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
