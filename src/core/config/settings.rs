use std::path::{Path, PathBuf};
use std::time::Duration;

use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_sync_mode, parse_u64, parse_u8, parse_usize,
};
use super::types::{
    ConfigError, DelayRange, MarkingSettings, Settings, SimulationSettings, StorageSettings,
    TelemetrySettings,
};
use crate::models::SyncMode;

impl Settings {
    /// Reads settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(env_or_default("MARKING_DATA_DIR", "."));
        let rubric_file = env_or_default("MARKING_RUBRIC_FILE", "rubric.txt");
        let exam_prefix = env_or_default("MARKING_EXAM_PREFIX", "exam_");
        let exam_suffix = env_or_default("MARKING_EXAM_SUFFIX", ".txt");

        let exercise_count =
            parse_usize("MARKING_EXERCISE_COUNT", env_or_default("MARKING_EXERCISE_COUNT", "5"))?;
        let sync_mode = parse_sync_mode(env_optional("MARKING_SYNC_MODE"))?;

        let review = DelayRange::new(
            parse_u64("MARKING_REVIEW_MIN_MS", env_or_default("MARKING_REVIEW_MIN_MS", "500"))?,
            parse_u64("MARKING_REVIEW_MAX_MS", env_or_default("MARKING_REVIEW_MAX_MS", "1000"))?,
        );
        let marking = DelayRange::new(
            parse_u64("MARKING_MARK_MIN_MS", env_or_default("MARKING_MARK_MIN_MS", "1000"))?,
            parse_u64("MARKING_MARK_MAX_MS", env_or_default("MARKING_MARK_MAX_MS", "2000"))?,
        );
        let correction_percent = parse_u8(
            "MARKING_CORRECTION_PERCENT",
            env_or_default("MARKING_CORRECTION_PERCENT", "30"),
        )?;
        let backoff_ms = parse_u64("MARKING_BACKOFF_MS", env_or_default("MARKING_BACKOFF_MS", "100"))?;
        let seed = env_optional("MARKING_SEED")
            .map(|value| parse_u64("MARKING_SEED", value))
            .transpose()?;

        let log_level = env_or_default("MARKING_LOG_LEVEL", "info");
        let json = env_optional("MARKING_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            storage: StorageSettings { data_dir, rubric_file, exam_prefix, exam_suffix },
            marking: MarkingSettings { exercise_count, sync_mode },
            simulation: SimulationSettings {
                review,
                marking,
                correction_percent,
                backoff: Duration::from_millis(backoff_ms),
                seed,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn simulation(&self) -> &SimulationSettings {
        &self.simulation
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn rubric_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.rubric_file)
    }

    pub fn data_dir(&self) -> &Path {
        &self.storage.data_dir
    }

    pub fn exercise_count(&self) -> usize {
        self.marking.exercise_count
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.marking.sync_mode
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.marking.exercise_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MARKING_EXERCISE_COUNT",
                value: "0".to_string(),
            });
        }

        if self.simulation.correction_percent > 100 {
            return Err(ConfigError::InvalidValue {
                field: "MARKING_CORRECTION_PERCENT",
                value: self.simulation.correction_percent.to_string(),
            });
        }

        for (field, range) in [
            ("MARKING_REVIEW_MIN_MS/MARKING_REVIEW_MAX_MS", self.simulation.review),
            ("MARKING_MARK_MIN_MS/MARKING_MARK_MAX_MS", self.simulation.marking),
        ] {
            if !range.is_valid() {
                return Err(ConfigError::InvalidRange {
                    field,
                    min: range.min_ms,
                    max: range.max_ms,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
impl Settings {
    /// Settings with no simulated delays, for exercising the protocol quickly.
    pub(crate) fn for_tests(exercise_count: usize, sync_mode: SyncMode) -> Self {
        Self {
            storage: StorageSettings {
                data_dir: PathBuf::from("."),
                rubric_file: "rubric.txt".to_string(),
                exam_prefix: "exam_".to_string(),
                exam_suffix: ".txt".to_string(),
            },
            marking: MarkingSettings { exercise_count, sync_mode },
            simulation: SimulationSettings {
                review: DelayRange::new(0, 0),
                marking: DelayRange::new(0, 2),
                correction_percent: 30,
                backoff: Duration::from_millis(5),
                seed: Some(7),
            },
            telemetry: TelemetrySettings {
                log_level: "debug".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }

    pub(crate) fn with_correction_percent(mut self, percent: u8) -> Self {
        self.simulation.correction_percent = percent;
        self
    }

    pub(crate) fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = data_dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    const VARS: &[&str] = &[
        "MARKING_DATA_DIR",
        "MARKING_EXERCISE_COUNT",
        "MARKING_SYNC_MODE",
        "MARKING_REVIEW_MIN_MS",
        "MARKING_REVIEW_MAX_MS",
        "MARKING_MARK_MIN_MS",
        "MARKING_MARK_MAX_MS",
        "MARKING_CORRECTION_PERCENT",
        "MARKING_BACKOFF_MS",
        "MARKING_SEED",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn load_uses_defaults() {
        let _guard = test_support::env_lock().await;
        clear_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.exercise_count(), 5);
        assert_eq!(settings.sync_mode(), SyncMode::Coordinated);
        assert_eq!(settings.simulation().review, DelayRange::new(500, 1000));
        assert_eq!(settings.simulation().marking, DelayRange::new(1000, 2000));
        assert_eq!(settings.simulation().backoff, Duration::from_millis(100));
        assert_eq!(settings.simulation().seed, None);
        assert_eq!(settings.rubric_path(), PathBuf::from(".").join("rubric.txt"));
    }

    #[tokio::test]
    async fn load_reads_overrides() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("MARKING_DATA_DIR", "/tmp/marking");
        std::env::set_var("MARKING_EXERCISE_COUNT", "3");
        std::env::set_var("MARKING_SYNC_MODE", "unguarded");
        std::env::set_var("MARKING_SEED", "42");

        let settings = Settings::load().expect("settings");
        clear_env();

        assert_eq!(settings.data_dir(), Path::new("/tmp/marking"));
        assert_eq!(settings.exercise_count(), 3);
        assert_eq!(settings.sync_mode(), SyncMode::Unguarded);
        assert_eq!(settings.simulation().seed, Some(42));
    }

    #[tokio::test]
    async fn load_rejects_inverted_delay_range() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("MARKING_MARK_MIN_MS", "50");
        std::env::set_var("MARKING_MARK_MAX_MS", "10");

        let err = Settings::load().expect_err("inverted range");
        clear_env();

        assert!(matches!(err, ConfigError::InvalidRange { min: 50, max: 10, .. }));
    }

    #[tokio::test]
    async fn load_rejects_zero_exercises_and_large_percent() {
        let _guard = test_support::env_lock().await;
        clear_env();
        std::env::set_var("MARKING_EXERCISE_COUNT", "0");
        assert!(Settings::load().is_err());

        clear_env();
        std::env::set_var("MARKING_CORRECTION_PERCENT", "101");
        let err = Settings::load().expect_err("percent");
        clear_env();

        assert!(matches!(err, ConfigError::InvalidValue { field: "MARKING_CORRECTION_PERCENT", .. }));
    }

    #[test]
    fn correction_probability_is_fractional() {
        let settings = Settings::for_tests(5, SyncMode::Coordinated).with_correction_percent(30);
        assert!((settings.simulation().correction_probability() - 0.3).abs() < f64::EPSILON);

        let always = Settings::for_tests(5, SyncMode::Coordinated).with_correction_percent(100);
        assert_eq!(always.simulation().correction_probability(), 1.0);
    }
}
