use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::core::config::DelayRange;
use crate::core::errors::MarkingError;
use crate::core::state::AppState;
use crate::models::{WorkerId, SENTINEL_STUDENT_ID};
use crate::services::exam_claims::{Claim, ClaimOutcome};
use crate::services::exam_transition::TransitionOutcome;
use crate::services::rubric_access::RubricAccessCoordinator;

/// Why a worker left its loop without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// The sentinel exam was observed.
    QueueExhausted,
    /// The scheduler asked every worker to stop.
    Cancelled,
}

impl WorkerExit {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            WorkerExit::QueueExhausted => "queue_exhausted",
            WorkerExit::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    ReviewingRubric,
    ClaimingQuestion,
    Marking(Claim),
    CompletingClaim(Claim),
    CheckingTransition { claimed: bool },
    Terminated(WorkerExit),
}

/// One TA. Every worker runs the same loop; they only interact through the
/// coordinators held in [`AppState`].
pub(crate) struct MarkingWorker {
    id: WorkerId,
    state: AppState,
    rng: StdRng,
    shutdown: watch::Receiver<bool>,
}

impl MarkingWorker {
    pub(crate) fn new(id: WorkerId, state: AppState, shutdown: watch::Receiver<bool>) -> Self {
        let rng = match state.settings().simulation().seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id.get() as u64)),
            None => StdRng::from_entropy(),
        };
        Self { id, state, rng, shutdown }
    }

    pub(crate) async fn run(mut self) -> Result<WorkerExit, MarkingError> {
        tracing::info!(worker = %self.id, "TA started");

        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => self.idle().await,
                Phase::ReviewingRubric => self.review_rubric().await?,
                Phase::ClaimingQuestion => self.claim_question().await?,
                Phase::Marking(claim) => self.mark(claim).await,
                Phase::CompletingClaim(claim) => self.complete(claim).await?,
                Phase::CheckingTransition { claimed } => self.check_transition(claimed).await?,
                Phase::Terminated(exit) => {
                    tracing::info!(worker = %self.id, reason = exit.as_str(), "TA finished");
                    return Ok(exit);
                }
            };
        }
    }

    async fn idle(&mut self) -> Phase {
        if *self.shutdown.borrow() {
            return Phase::Terminated(WorkerExit::Cancelled);
        }

        let student = self.state.session().student_id().await;
        if student == SENTINEL_STUDENT_ID {
            return Phase::Terminated(WorkerExit::QueueExhausted);
        }

        tracing::debug!(worker = %self.id, student, "Starting marking round");
        Phase::ReviewingRubric
    }

    async fn review_rubric(&mut self) -> Result<Phase, MarkingError> {
        let state = self.state.clone();
        let rubric = state.rubric();
        let simulation = state.settings().simulation();
        let probability = simulation.correction_probability();

        let mut hold = rubric.acquire_read(self.id).await?;
        for exercise in 0..state.settings().exercise_count() {
            let entry = rubric.entry(&hold, exercise)?;
            let delay = sample_delay(&mut self.rng, simulation.review);
            tracing::info!(
                worker = %self.id,
                exercise = exercise + 1,
                entry = entry.as_ref().map(|line| line.as_str()).unwrap_or_default(),
                delay_ms = delay.as_millis() as u64,
                "Reviewing rubric entry"
            );
            sleep(delay).await;

            if self.rng.gen_bool(probability) {
                // No upgrade in place: give the read hold back before asking to write.
                rubric.release_read(hold).await;
                self.correct_entry(rubric, exercise).await?;
                hold = rubric.acquire_read(self.id).await?;
            }
        }
        rubric.release_read(hold).await;

        Ok(Phase::ClaimingQuestion)
    }

    async fn correct_entry(
        &self,
        rubric: &RubricAccessCoordinator,
        exercise: usize,
    ) -> Result<(), MarkingError> {
        let hold = rubric.acquire_write(self.id).await?;
        let corrected = rubric.correct(&hold, exercise).await;
        rubric.release_write(hold);

        match corrected? {
            Some(_) => self.state.stats().record_rubric_correction(),
            None => tracing::warn!(
                worker = %self.id,
                exercise = exercise + 1,
                "Rubric entry has no correctable value, leaving it unchanged"
            ),
        }
        Ok(())
    }

    async fn claim_question(&mut self) -> Result<Phase, MarkingError> {
        let phase = match self.state.claims().try_claim_next_unmarked(self.id).await? {
            ClaimOutcome::Claimed(claim) => Phase::Marking(claim),
            ClaimOutcome::NoneAvailable => Phase::CheckingTransition { claimed: false },
            ClaimOutcome::QueueExhausted => Phase::Terminated(WorkerExit::QueueExhausted),
        };
        Ok(phase)
    }

    async fn mark(&mut self, claim: Claim) -> Phase {
        let delay = sample_delay(&mut self.rng, self.state.settings().simulation().marking);
        tracing::info!(
            worker = %self.id,
            student = claim.student_id,
            exercise = claim.slot + 1,
            delay_ms = delay.as_millis() as u64,
            "Marking question"
        );

        tokio::select! {
            _ = sleep(delay) => Phase::CompletingClaim(claim),
            _ = self.shutdown.changed() => Phase::Terminated(WorkerExit::Cancelled),
        }
    }

    async fn complete(&mut self, claim: Claim) -> Result<Phase, MarkingError> {
        self.state.claims().complete_claim(claim).await?;
        self.state.stats().record_question_marked();
        Ok(Phase::CheckingTransition { claimed: true })
    }

    async fn check_transition(&mut self, claimed: bool) -> Result<Phase, MarkingError> {
        let outcome = self.state.transitions().maybe_advance(self.id).await?;
        if outcome.replaced_exam() {
            self.state.stats().record_exam_transition();
        }

        if outcome == TransitionOutcome::NotReady && !claimed {
            self.back_off().await;
        }
        Ok(Phase::Idle)
    }

    // Bounded wait; a completion or transition elsewhere ends it early.
    async fn back_off(&mut self) {
        let state = self.state.clone();
        let backoff = state.settings().simulation().backoff;
        state.stats().record_claim_backoff();
        tracing::info!(
            worker = %self.id,
            backoff_ms = backoff.as_millis() as u64,
            "No question available, waiting"
        );

        tokio::select! {
            _ = state.session().progressed() => {}
            _ = sleep(backoff) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}

fn sample_delay(rng: &mut StdRng, range: DelayRange) -> Duration {
    Duration::from_millis(rng.gen_range(range.min_ms..=range.max_ms))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::bootstrap;
    use crate::core::config::Settings;
    use crate::models::SyncMode;
    use crate::test_support::{MemoryExams, MemoryRubric};

    async fn state_with(settings: Settings, students: Vec<i64>) -> (AppState, Arc<MemoryExams>) {
        let rubric = Arc::new(MemoryRubric::standard(settings.exercise_count()));
        let exams = Arc::new(MemoryExams::new(students, settings.exercise_count()));
        let state = bootstrap::initial_state(settings, rubric, exams.clone()).await.expect("state");
        (state, exams)
    }

    #[tokio::test]
    async fn single_worker_marks_everything_and_stops_at_sentinel() {
        let settings = Settings::for_tests(3, SyncMode::Coordinated);
        let (state, exams) = state_with(settings, vec![111, 222, 9999]).await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let exit = MarkingWorker::new(WorkerId::new(1), state.clone(), shutdown_rx)
            .run()
            .await
            .expect("worker");

        assert_eq!(exit, WorkerExit::QueueExhausted);
        assert_eq!(exams.loads(), vec![1, 2, 3]);
        let summary = state.stats().summary(state.session().snapshot().await.exam_index());
        assert_eq!(summary.questions_marked, 6);
        assert_eq!(summary.exams_completed, 2);
    }

    #[tokio::test]
    async fn worker_stops_when_shutdown_is_requested() {
        let settings = Settings::for_tests(3, SyncMode::Coordinated);
        let (state, _) = state_with(settings, vec![111, 9999]).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).expect("send");

        let exit = MarkingWorker::new(WorkerId::new(1), state.clone(), shutdown_rx)
            .run()
            .await
            .expect("worker");

        assert_eq!(exit, WorkerExit::Cancelled);
        assert_eq!(state.stats().summary(1).questions_marked, 0);
    }

    #[tokio::test]
    async fn every_review_corrects_when_probability_is_certain() {
        let settings = Settings::for_tests(2, SyncMode::Coordinated).with_correction_percent(100);
        let rubric = Arc::new(MemoryRubric::standard(2));
        let exams = Arc::new(MemoryExams::new(vec![111, 9999], 2));
        let state =
            bootstrap::initial_state(settings, rubric.clone(), exams).await.expect("state");
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        MarkingWorker::new(WorkerId::new(1), state.clone(), shutdown_rx)
            .run()
            .await
            .expect("worker");

        let summary = state.stats().summary(2);
        let saves = rubric.saves();
        assert_eq!(summary.rubric_corrections, saves.len() as u64);
        assert!(summary.rubric_corrections >= 2);
        assert_eq!(saves.last().cloned(), Some(state.rubric().snapshot().expect("snapshot")));
    }

    #[tokio::test]
    async fn closed_rubric_fails_the_worker() {
        let settings = Settings::for_tests(2, SyncMode::Coordinated);
        let (state, _) = state_with(settings, vec![111, 9999]).await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        state.close_primitives();

        let err = MarkingWorker::new(WorkerId::new(1), state, shutdown_rx)
            .run()
            .await
            .expect_err("closed primitive");
        assert!(matches!(err, MarkingError::SynchronizationFailure { .. }));
    }
}
