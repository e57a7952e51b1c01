pub(crate) mod core;
pub(crate) mod models;
pub(crate) mod repositories;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

pub use crate::core::config::{ConfigError, Settings};
pub use crate::core::errors::MarkingError;
pub use crate::models::{SyncMode, SENTINEL_STUDENT_ID};
pub use crate::services::stats::RunSummary;

use crate::core::{bootstrap, telemetry};
use crate::repositories::exams::ExamFiles;
use crate::repositories::rubric::RubricFile;

pub async fn run(worker_count: usize) -> anyhow::Result<RunSummary> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    tracing::info!(
        data_dir = %settings.data_dir().display(),
        exercises = settings.exercise_count(),
        mode = settings.sync_mode().as_str(),
        "Starting TA marking"
    );

    let summary = mark_exams(settings, worker_count).await?;

    tracing::info!(
        exams_completed = summary.exams_completed,
        questions_marked = summary.questions_marked,
        rubric_corrections = summary.rubric_corrections,
        claim_backoffs = summary.claim_backoffs,
        last_exam_index = summary.last_exam_index,
        "All TAs finished"
    );
    if let Some(snapshot) = core::metrics::render() {
        tracing::info!(metrics = %snapshot, "Metrics snapshot");
    }

    Ok(summary)
}

/// Marks every exam in the configured data directory with `worker_count` TAs.
///
/// Startup problems (bad worker count, unreadable rubric, missing first exam)
/// are returned before any worker starts.
pub async fn mark_exams(settings: Settings, worker_count: usize) -> Result<RunSummary, MarkingError> {
    if worker_count < 2 {
        return Err(ConfigError::InvalidWorkerCount(worker_count).into());
    }

    let rubric = Arc::new(RubricFile::from_settings(&settings));
    let exams = Arc::new(ExamFiles::from_settings(&settings));
    let state = bootstrap::initial_state(settings, rubric, exams).await?;

    tasks::scheduler::run(state, worker_count).await
}
