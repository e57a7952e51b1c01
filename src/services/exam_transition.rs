//! Replacing a fully marked exam with the next one.
//!
//! Only one worker may perform a given transition. Callers race freely to
//! observe "all marked"; the winner is whoever takes the transition lock
//! first and still sees the same exam fully marked once it holds both the
//! transition lock and the exam lock. Lock order is always transition, then
//! exam.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::errors::MarkingError;
use crate::models::{ExamRecord, SyncMode, WorkerId};
use crate::repositories::exams::ExamRepository;
use crate::services::exam_session::ExamSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionOutcome {
    /// Some question of the current exam is not marked yet.
    NotReady,
    Advanced { from_student: i64, to_student: i64, exam_index: u32 },
    /// There was no exam at `exam_index`; a sentinel record took its place.
    Exhausted { exam_index: u32 },
    /// Another worker performed the transition first.
    AlreadyAdvanced,
    /// The current record is already the sentinel.
    Terminal,
}

impl TransitionOutcome {
    pub(crate) fn replaced_exam(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Exhausted { .. })
    }
}

pub(crate) struct ExamTransitionCoordinator {
    mode: SyncMode,
    session: Arc<ExamSession>,
    repository: Arc<dyn ExamRepository>,
    question_count: usize,
    transition: Mutex<()>,
}

impl ExamTransitionCoordinator {
    pub(crate) fn new(
        mode: SyncMode,
        session: Arc<ExamSession>,
        repository: Arc<dyn ExamRepository>,
        question_count: usize,
    ) -> Self {
        Self { mode, session, repository, question_count, transition: Mutex::new(()) }
    }

    pub(crate) async fn maybe_advance(
        &self,
        worker: WorkerId,
    ) -> Result<TransitionOutcome, MarkingError> {
        let observed = {
            let record = self.session.lock().await;
            if record.is_sentinel() {
                return Ok(TransitionOutcome::Terminal);
            }
            if !record.all_marked() {
                return Ok(TransitionOutcome::NotReady);
            }
            record.exam_index()
        };

        if !self.mode.is_coordinated() {
            return self.advance_unguarded(worker, observed).await;
        }

        let transition = self.transition.lock().await;
        tracing::debug!(worker = %worker, "Acquired exam transition lock");
        let mut record = self.session.lock().await;

        if record.exam_index() != observed || record.is_sentinel() || !record.all_marked() {
            drop(record);
            drop(transition);
            tracing::debug!(worker = %worker, exam_index = observed, "Exam already advanced");
            return Ok(TransitionOutcome::AlreadyAdvanced);
        }

        let next_index = observed + 1;
        let from_student = record.student_id();
        let next = self.repository.load(next_index).await?;
        let outcome = self.replace(&mut record, next, next_index, from_student);

        drop(record);
        drop(transition);
        tracing::debug!(worker = %worker, "Released exam transition lock");

        self.log_outcome(worker, &outcome);
        self.session.notify_progress();
        Ok(outcome)
    }

    // No transition lock and no double-check: every worker that saw the exam
    // fully marked loads and installs the next one.
    async fn advance_unguarded(
        &self,
        worker: WorkerId,
        observed: u32,
    ) -> Result<TransitionOutcome, MarkingError> {
        tokio::task::yield_now().await;

        let next_index = observed + 1;
        let next = self.repository.load(next_index).await?;
        let outcome = {
            let mut record = self.session.lock().await;
            let from_student = record.student_id();
            self.replace(&mut record, next, next_index, from_student)
        };

        self.log_outcome(worker, &outcome);
        self.session.notify_progress();
        Ok(outcome)
    }

    fn replace(
        &self,
        record: &mut ExamRecord,
        next: Option<ExamRecord>,
        next_index: u32,
        from_student: i64,
    ) -> TransitionOutcome {
        match next {
            Some(exam) => {
                let to_student = exam.student_id();
                *record = exam;
                TransitionOutcome::Advanced { from_student, to_student, exam_index: next_index }
            }
            None => {
                *record = ExamRecord::exhausted(next_index, self.question_count);
                TransitionOutcome::Exhausted { exam_index: next_index }
            }
        }
    }

    fn log_outcome(&self, worker: WorkerId, outcome: &TransitionOutcome) {
        match outcome {
            TransitionOutcome::Advanced { from_student, to_student, exam_index } => {
                tracing::info!(
                    worker = %worker,
                    from_student,
                    to_student,
                    exam_index,
                    "Loaded next exam"
                );
            }
            TransitionOutcome::Exhausted { exam_index } => {
                tracing::info!(
                    worker = %worker,
                    exam_index,
                    location = %self.repository.location(*exam_index),
                    "No further exam, queue exhausted"
                );
            }
            _ => {}
        }
    }
}
