use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::metrics::{CLAIM_BACKOFFS, EXAM_TRANSITIONS, QUESTIONS_MARKED, RUBRIC_CORRECTIONS};

#[derive(Debug, Default)]
pub(crate) struct RunStats {
    questions_marked: AtomicU64,
    rubric_corrections: AtomicU64,
    exam_transitions: AtomicU64,
    claim_backoffs: AtomicU64,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Exams whose questions were all marked and that were replaced by the next one.
    pub exams_completed: u64,
    pub questions_marked: u64,
    pub rubric_corrections: u64,
    pub claim_backoffs: u64,
    /// Index of the exam record in place when the run ended.
    pub last_exam_index: u32,
}

impl RunStats {
    pub(crate) fn record_question_marked(&self) {
        self.questions_marked.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(QUESTIONS_MARKED).increment(1);
    }

    pub(crate) fn record_rubric_correction(&self) {
        self.rubric_corrections.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(RUBRIC_CORRECTIONS).increment(1);
    }

    pub(crate) fn record_exam_transition(&self) {
        self.exam_transitions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(EXAM_TRANSITIONS).increment(1);
    }

    pub(crate) fn record_claim_backoff(&self) {
        self.claim_backoffs.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(CLAIM_BACKOFFS).increment(1);
    }

    pub(crate) fn summary(&self, last_exam_index: u32) -> RunSummary {
        RunSummary {
            exams_completed: self.exam_transitions.load(Ordering::Relaxed),
            questions_marked: self.questions_marked.load(Ordering::Relaxed),
            rubric_corrections: self.rubric_corrections.load(Ordering::Relaxed),
            claim_backoffs: self.claim_backoffs.load(Ordering::Relaxed),
            last_exam_index,
        }
    }
}
