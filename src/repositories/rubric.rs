use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::core::config::Settings;
use crate::core::errors::MarkingError;
use crate::models::RubricLine;

/// External storage for the rubric: one line per exercise, in slot order.
#[async_trait]
pub(crate) trait RubricRepository: Send + Sync {
    async fn load(&self) -> Result<Vec<RubricLine>, MarkingError>;

    /// Replaces the stored rubric with `lines`.
    async fn save(&self, lines: &[RubricLine]) -> Result<(), MarkingError>;

    fn location(&self) -> String;
}

pub(crate) struct RubricFile {
    path: PathBuf,
    exercise_count: usize,
    saves: AtomicU64,
}

impl RubricFile {
    pub(crate) fn new(path: impl Into<PathBuf>, exercise_count: usize) -> Self {
        Self { path: path.into(), exercise_count, saves: AtomicU64::new(0) }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.rubric_path(), settings.exercise_count())
    }

    // Unguarded runs may save concurrently, so each save stages to its own file.
    fn staging_path(&self, save: u64) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rubric".to_string());
        self.path.with_file_name(format!(".{name}.{save}.tmp"))
    }
}

#[async_trait]
impl RubricRepository for RubricFile {
    async fn load(&self) -> Result<Vec<RubricLine>, MarkingError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| MarkingError::RubricUnavailable { path: self.path.clone(), source })?;

        let lines: Vec<RubricLine> = raw
            .lines()
            .take(self.exercise_count)
            .map(|line| RubricLine::new(line.trim_end_matches('\r')))
            .collect();

        if lines.len() < self.exercise_count {
            return Err(MarkingError::RubricIncomplete {
                path: self.path.clone(),
                expected: self.exercise_count,
                found: lines.len(),
            });
        }

        Ok(lines)
    }

    async fn save(&self, lines: &[RubricLine]) -> Result<(), MarkingError> {
        let mut contents = String::new();
        for line in lines {
            contents.push_str(line.as_str());
            contents.push('\n');
        }

        // Rename over the original so readers of the file never see a partial write.
        let staging = self.staging_path(self.saves.fetch_add(1, Ordering::Relaxed));
        tokio::fs::write(&staging, contents)
            .await
            .map_err(|source| MarkingError::storage(&staging, source))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| MarkingError::storage(&self.path, source))?;

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
