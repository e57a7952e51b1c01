use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::models::SyncMode;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) storage: StorageSettings,
    pub(super) marking: MarkingSettings,
    pub(super) simulation: SimulationSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct StorageSettings {
    pub(crate) data_dir: PathBuf,
    pub(crate) rubric_file: String,
    pub(crate) exam_prefix: String,
    pub(crate) exam_suffix: String,
}

#[derive(Debug, Clone)]
pub(crate) struct MarkingSettings {
    pub(crate) exercise_count: usize,
    pub(crate) sync_mode: SyncMode,
}

#[derive(Debug, Clone)]
pub(crate) struct SimulationSettings {
    pub(crate) review: DelayRange,
    pub(crate) marking: DelayRange,
    pub(crate) correction_percent: u8,
    pub(crate) backoff: Duration,
    pub(crate) seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

/// Inclusive range of simulated work time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DelayRange {
    pub(crate) min_ms: u64,
    pub(crate) max_ms: u64,
}

impl DelayRange {
    pub(crate) fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub(crate) fn is_valid(self) -> bool {
        self.min_ms <= self.max_ms
    }
}

impl SimulationSettings {
    pub(crate) fn correction_probability(&self) -> f64 {
        f64::from(self.correction_percent) / 100.0
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid range for {field}: min {min} is greater than max {max}")]
    InvalidRange { field: &'static str, min: u64, max: u64 },
    #[error("number of TAs must be at least 2, got {0}")]
    InvalidWorkerCount(usize),
}
