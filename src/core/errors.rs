use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigError;

#[derive(Debug, Error)]
pub enum MarkingError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not open rubric {}: {source}", path.display())]
    RubricUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rubric {} has {found} entries, expected {expected}", path.display())]
    RubricIncomplete { path: PathBuf, expected: usize, found: usize },
    #[error("could not load first exam ({location})")]
    FirstExamUnavailable { location: String },
    #[error("exam {} does not start with a student number: {line:?}", path.display())]
    ExamMalformed { path: PathBuf, line: String },
    #[error("storage failure on {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("synchronization primitive failed: {primitive}")]
    SynchronizationFailure { primitive: &'static str },
    #[error("claim protocol violated on question {}: {detail}", slot + 1)]
    ClaimViolation { slot: usize, detail: String },
    #[error("worker task aborted: {detail}")]
    WorkerPanicked { detail: String },
    #[error("marking interrupted by {signal}")]
    Interrupted { signal: &'static str },
}

impl MarkingError {
    pub(crate) fn sync(primitive: &'static str) -> Self {
        Self::SynchronizationFailure { primitive }
    }

    pub(crate) fn claim_violation(slot: usize, detail: impl Into<String>) -> Self {
        Self::ClaimViolation { slot, detail: detail.into() }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage { path: path.into(), source }
    }

    /// Errors raised while loading the initial rubric and exam, before any worker starts.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            MarkingError::Config(_)
                | MarkingError::RubricUnavailable { .. }
                | MarkingError::RubricIncomplete { .. }
                | MarkingError::FirstExamUnavailable { .. }
        )
    }
}
