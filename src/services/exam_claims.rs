use std::sync::Arc;

use crate::core::errors::MarkingError;
use crate::models::{QuestionState, SyncMode, WorkerId};
use crate::services::exam_session::ExamSession;

/// A question reserved by one worker on one exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Claim {
    pub(crate) exam_index: u32,
    pub(crate) student_id: i64,
    pub(crate) slot: usize,
    pub(crate) worker: WorkerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClaimOutcome {
    Claimed(Claim),
    /// Every question of the current exam is claimed or marked.
    NoneAvailable,
    /// The current record is the end-of-queue sentinel.
    QueueExhausted,
}

/// Hands out unmarked questions of the current exam, lowest slot first.
pub(crate) struct ExamClaimCoordinator {
    mode: SyncMode,
    session: Arc<ExamSession>,
}

impl ExamClaimCoordinator {
    pub(crate) fn new(mode: SyncMode, session: Arc<ExamSession>) -> Self {
        Self { mode, session }
    }

    pub(crate) async fn try_claim_next_unmarked(
        &self,
        worker: WorkerId,
    ) -> Result<ClaimOutcome, MarkingError> {
        if !self.mode.is_coordinated() {
            return Ok(self.claim_unguarded(worker).await);
        }

        let mut record = self.session.lock().await;
        tracing::debug!(worker = %worker, "Locked exam state for claiming");

        if record.is_sentinel() {
            return Ok(ClaimOutcome::QueueExhausted);
        }
        let Some(slot) = record.first_unmarked() else {
            tracing::debug!(worker = %worker, "No unmarked question left on current exam");
            return Ok(ClaimOutcome::NoneAvailable);
        };

        record.claim(slot, worker)?;
        let claim = Claim {
            exam_index: record.exam_index(),
            student_id: record.student_id(),
            slot,
            worker,
        };
        drop(record);
        tracing::debug!(worker = %worker, "Unlocked exam state");

        tracing::info!(
            worker = %worker,
            student = claim.student_id,
            exercise = slot + 1,
            "Claimed question"
        );
        Ok(ClaimOutcome::Claimed(claim))
    }

    // Observe and write in two separate critical sections, leaving room for
    // another worker to pick the same slot in between. The write is still
    // confined to the exam that was observed.
    async fn claim_unguarded(&self, worker: WorkerId) -> ClaimOutcome {
        let observed = self.session.snapshot().await;
        if observed.is_sentinel() {
            return ClaimOutcome::QueueExhausted;
        }
        let Some(slot) = observed.first_unmarked() else {
            return ClaimOutcome::NoneAvailable;
        };

        tokio::task::yield_now().await;
        {
            let mut record = self.session.lock().await;
            if record.exam_index() != observed.exam_index() {
                tracing::debug!(worker = %worker, "Exam changed before the claim landed");
                return ClaimOutcome::NoneAvailable;
            }
            record.overwrite(slot, QuestionState::Claimed { by: worker });
        }

        tracing::info!(
            worker = %worker,
            student = observed.student_id(),
            exercise = slot + 1,
            "Claimed question without exclusion"
        );
        ClaimOutcome::Claimed(Claim {
            exam_index: observed.exam_index(),
            student_id: observed.student_id(),
            slot,
            worker,
        })
    }

    /// Marks the claimed question complete and wakes workers waiting for progress.
    pub(crate) async fn complete_claim(&self, claim: Claim) -> Result<(), MarkingError> {
        let marked = {
            let mut record = self.session.lock().await;
            if record.exam_index() != claim.exam_index {
                if self.mode.is_coordinated() {
                    return Err(MarkingError::claim_violation(
                        claim.slot,
                        format!(
                            "exam {} was replaced by exam {} while the question was claimed",
                            claim.exam_index,
                            record.exam_index()
                        ),
                    ));
                }
                tracing::warn!(
                    worker = %claim.worker,
                    student = claim.student_id,
                    exercise = claim.slot + 1,
                    "Exam changed under an unguarded claim, dropping the mark"
                );
            } else if self.mode.is_coordinated() {
                record.complete(claim.slot, claim.worker)?;
            } else {
                record.overwrite(claim.slot, QuestionState::Marked { by: claim.worker });
            }
            record.marked_count()
        };

        tracing::info!(
            worker = %claim.worker,
            student = claim.student_id,
            exercise = claim.slot + 1,
            marked,
            "Finished marking question"
        );
        self.session.notify_progress();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExamRecord;

    fn coordinator(mode: SyncMode, record: ExamRecord) -> (Arc<ExamClaimCoordinator>, Arc<ExamSession>) {
        let session = Arc::new(ExamSession::new(record));
        (Arc::new(ExamClaimCoordinator::new(mode, session.clone())), session)
    }

    fn claimed(outcome: ClaimOutcome) -> Claim {
        match outcome {
            ClaimOutcome::Claimed(claim) => claim,
            other => panic!("expected a claim, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn claims_lowest_unmarked_slot_first() {
        let (claims, _) = coordinator(SyncMode::Coordinated, ExamRecord::new(111, 1, 3));

        let mut slots = Vec::new();
        for worker in 1..=3 {
            let outcome = claims.try_claim_next_unmarked(WorkerId::new(worker)).await.expect("claim");
            slots.push(claimed(outcome).slot);
        }
        assert_eq!(slots, vec![0, 1, 2]);

        let outcome = claims.try_claim_next_unmarked(WorkerId::new(4)).await.expect("claim");
        assert_eq!(outcome, ClaimOutcome::NoneAvailable);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_free_slot_goes_to_exactly_one_worker() {
        let (claims, _) = coordinator(SyncMode::Coordinated, ExamRecord::new(111, 1, 1));

        let mut handles = Vec::new();
        for worker in 1..=6 {
            let claims = claims.clone();
            handles.push(tokio::spawn(async move {
                claims.try_claim_next_unmarked(WorkerId::new(worker)).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.expect("join").expect("claim") {
                ClaimOutcome::Claimed(claim) => {
                    assert_eq!(claim.slot, 0);
                    winners += 1;
                }
                ClaimOutcome::NoneAvailable => {}
                ClaimOutcome::QueueExhausted => panic!("queue is not exhausted"),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn unguarded_claims_can_collide() {
        let (claims, _) = coordinator(SyncMode::Unguarded, ExamRecord::new(111, 1, 5));

        let (first, second) = tokio::join!(
            claims.try_claim_next_unmarked(WorkerId::new(1)),
            claims.try_claim_next_unmarked(WorkerId::new(2)),
        );

        let first = claimed(first.expect("claim"));
        let second = claimed(second.expect("claim"));
        assert_eq!(first.slot, second.slot, "both workers observed the same free slot");
    }

    #[tokio::test]
    async fn unguarded_claim_never_lands_on_the_next_exam() {
        let (claims, session) = coordinator(SyncMode::Unguarded, ExamRecord::new(111, 1, 2));
        let worker = WorkerId::new(1);

        let (outcome, ()) = tokio::join!(claims.try_claim_next_unmarked(worker), async {
            *session.lock().await = ExamRecord::new(222, 2, 2);
        });
        assert_eq!(outcome.expect("claim"), ClaimOutcome::NoneAvailable);
        assert_eq!(session.snapshot().await.question(0), Some(QuestionState::Unmarked));

        for _ in 0..2 {
            let claim = claimed(claims.try_claim_next_unmarked(worker).await.expect("claim"));
            assert_eq!(claim.exam_index, 2);
            claims.complete_claim(claim).await.expect("complete");
        }
        assert!(session.snapshot().await.all_marked());
    }

    #[tokio::test]
    async fn sentinel_exam_exhausts_queue() {
        let (claims, _) = coordinator(SyncMode::Coordinated, ExamRecord::exhausted(3, 5));
        let outcome = claims.try_claim_next_unmarked(WorkerId::new(1)).await.expect("claim");
        assert_eq!(outcome, ClaimOutcome::QueueExhausted);
    }

    #[tokio::test]
    async fn completing_marks_the_question() {
        let (claims, session) = coordinator(SyncMode::Coordinated, ExamRecord::new(111, 1, 2));
        let worker = WorkerId::new(1);

        let claim = claimed(claims.try_claim_next_unmarked(worker).await.expect("claim"));
        claims.complete_claim(claim).await.expect("complete");

        let record = session.snapshot().await;
        assert_eq!(record.question(0), Some(QuestionState::Marked { by: worker }));
        assert_eq!(record.question(1), Some(QuestionState::Unmarked));
    }

    #[tokio::test]
    async fn completing_on_a_replaced_exam_is_a_violation() {
        let (claims, session) = coordinator(SyncMode::Coordinated, ExamRecord::new(111, 1, 2));
        let claim = claimed(claims.try_claim_next_unmarked(WorkerId::new(1)).await.expect("claim"));

        *session.lock().await = ExamRecord::new(222, 2, 2);

        let err = claims.complete_claim(claim).await.expect_err("exam replaced");
        assert!(matches!(err, MarkingError::ClaimViolation { slot: 0, .. }));
    }
}
