use crate::core::errors::MarkingError;
use crate::models::types::{QuestionState, WorkerId};

/// Student identifier that marks the end of the exam queue.
pub const SENTINEL_STUDENT_ID: i64 = 9999;

/// The exam currently being marked together with per-question progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExamRecord {
    student_id: i64,
    exam_index: u32,
    questions: Vec<QuestionState>,
}

impl ExamRecord {
    pub(crate) fn new(student_id: i64, exam_index: u32, question_count: usize) -> Self {
        Self { student_id, exam_index, questions: vec![QuestionState::Unmarked; question_count] }
    }

    /// Synthetic terminal record used when no exam exists at `exam_index`.
    pub(crate) fn exhausted(exam_index: u32, question_count: usize) -> Self {
        Self::new(SENTINEL_STUDENT_ID, exam_index, question_count)
    }

    pub(crate) fn student_id(&self) -> i64 {
        self.student_id
    }

    pub(crate) fn exam_index(&self) -> u32 {
        self.exam_index
    }

    pub(crate) fn is_sentinel(&self) -> bool {
        self.student_id == SENTINEL_STUDENT_ID
    }

    pub(crate) fn question(&self, slot: usize) -> Option<QuestionState> {
        self.questions.get(slot).copied()
    }

    pub(crate) fn first_unmarked(&self) -> Option<usize> {
        self.questions.iter().position(|state| state.is_unmarked())
    }

    pub(crate) fn all_marked(&self) -> bool {
        self.questions.iter().all(|state| state.is_marked())
    }

    pub(crate) fn marked_count(&self) -> usize {
        self.questions.iter().filter(|state| state.is_marked()).count()
    }

    pub(crate) fn claim(&mut self, slot: usize, worker: WorkerId) -> Result<(), MarkingError> {
        match self.question(slot) {
            Some(QuestionState::Unmarked) => {
                self.questions[slot] = QuestionState::Claimed { by: worker };
                Ok(())
            }
            Some(state) => Err(MarkingError::claim_violation(
                slot,
                format!("cannot claim a question that is {}", state.as_str()),
            )),
            None => Err(MarkingError::claim_violation(slot, "no such question")),
        }
    }

    pub(crate) fn complete(&mut self, slot: usize, worker: WorkerId) -> Result<(), MarkingError> {
        match self.question(slot) {
            Some(QuestionState::Claimed { by }) if by == worker => {
                self.questions[slot] = QuestionState::Marked { by: worker };
                Ok(())
            }
            Some(QuestionState::Claimed { by }) => Err(MarkingError::claim_violation(
                slot,
                format!("question is claimed by {by}, not {worker}"),
            )),
            Some(state) => Err(MarkingError::claim_violation(
                slot,
                format!("cannot complete a question that is {}", state.as_str()),
            )),
            None => Err(MarkingError::claim_violation(slot, "no such question")),
        }
    }

    /// Writes a slot without checking the transition. Only the unguarded mode uses this.
    pub(crate) fn overwrite(&mut self, slot: usize, state: QuestionState) {
        if let Some(current) = self.questions.get_mut(slot) {
            *current = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_unmarked() {
        let record = ExamRecord::new(111, 1, 5);
        assert!((0..5).all(|slot| record.question(slot) == Some(QuestionState::Unmarked)));
        assert_eq!(record.question(5), None);
        assert_eq!(record.first_unmarked(), Some(0));
        assert!(!record.all_marked());
        assert!(!record.is_sentinel());
    }

    #[test]
    fn claim_then_complete_moves_forward() {
        let worker = WorkerId::new(2);
        let mut record = ExamRecord::new(111, 1, 2);

        record.claim(0, worker).expect("claim");
        assert_eq!(record.question(0), Some(QuestionState::Claimed { by: worker }));
        assert_eq!(record.first_unmarked(), Some(1));

        record.complete(0, worker).expect("complete");
        assert_eq!(record.question(0), Some(QuestionState::Marked { by: worker }));
        assert_eq!(record.marked_count(), 1);
    }

    #[test]
    fn claim_rejects_non_unmarked_slots() {
        let worker = WorkerId::new(1);
        let mut record = ExamRecord::new(111, 1, 1);
        record.claim(0, worker).expect("claim");

        let err = record.claim(0, WorkerId::new(2)).expect_err("double claim");
        assert!(matches!(err, MarkingError::ClaimViolation { slot: 0, .. }));
        assert!(record.claim(7, worker).is_err());
    }

    #[test]
    fn complete_requires_own_claim() {
        let owner = WorkerId::new(1);
        let other = WorkerId::new(2);
        let mut record = ExamRecord::new(111, 1, 2);

        assert!(record.complete(0, owner).is_err());

        record.claim(0, owner).expect("claim");
        assert!(record.complete(0, other).is_err());
        record.complete(0, owner).expect("complete");
        assert!(record.complete(0, owner).is_err());
    }

    #[test]
    fn all_marked_after_every_slot_completes() {
        let worker = WorkerId::new(1);
        let mut record = ExamRecord::new(111, 1, 3);
        for slot in 0..3 {
            record.claim(slot, worker).expect("claim");
            record.complete(slot, worker).expect("complete");
        }
        assert!(record.all_marked());
        assert_eq!(record.first_unmarked(), None);
    }

    #[test]
    fn exhausted_record_is_sentinel() {
        let record = ExamRecord::exhausted(4, 5);
        assert!(record.is_sentinel());
        assert_eq!(record.student_id(), SENTINEL_STUDENT_ID);
        assert_eq!(record.exam_index(), 4);
    }
}
