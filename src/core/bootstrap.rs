use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::errors::MarkingError;
use crate::core::state::AppState;
use crate::repositories::exams::ExamRepository;
use crate::repositories::rubric::RubricRepository;

const FIRST_EXAM_INDEX: u32 = 1;

/// Loads the rubric and the first exam. Both are required before any worker starts.
pub(crate) async fn initial_state(
    settings: Settings,
    rubric_repository: Arc<dyn RubricRepository>,
    exam_repository: Arc<dyn ExamRepository>,
) -> Result<AppState, MarkingError> {
    let lines = rubric_repository.load().await?;
    tracing::info!(
        entries = lines.len(),
        source = %rubric_repository.location(),
        "Loaded rubric into shared state"
    );

    let first_exam = exam_repository.load(FIRST_EXAM_INDEX).await?.ok_or_else(|| {
        MarkingError::FirstExamUnavailable { location: exam_repository.location(FIRST_EXAM_INDEX) }
    })?;
    tracing::info!(
        student = first_exam.student_id(),
        exam_index = first_exam.exam_index(),
        "Loaded first exam"
    );

    Ok(AppState::new(settings, lines, first_exam, rubric_repository, exam_repository))
}
