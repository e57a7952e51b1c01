use std::sync::Arc;

use crate::core::config::Settings;
use crate::models::{ExamRecord, RubricLine};
use crate::repositories::exams::ExamRepository;
use crate::repositories::rubric::RubricRepository;
use crate::services::exam_claims::ExamClaimCoordinator;
use crate::services::exam_session::ExamSession;
use crate::services::exam_transition::ExamTransitionCoordinator;
use crate::services::rubric_access::RubricAccessCoordinator;
use crate::services::stats::RunStats;

/// Everything the workers share. Cloning is cheap.
#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    rubric: RubricAccessCoordinator,
    session: Arc<ExamSession>,
    claims: ExamClaimCoordinator,
    transitions: ExamTransitionCoordinator,
    stats: RunStats,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        rubric_lines: Vec<RubricLine>,
        first_exam: ExamRecord,
        rubric_repository: Arc<dyn RubricRepository>,
        exam_repository: Arc<dyn ExamRepository>,
    ) -> Self {
        let mode = settings.sync_mode();
        let session = Arc::new(ExamSession::new(first_exam));
        let rubric = RubricAccessCoordinator::new(mode, rubric_lines, rubric_repository);
        let claims = ExamClaimCoordinator::new(mode, session.clone());
        let transitions = ExamTransitionCoordinator::new(
            mode,
            session.clone(),
            exam_repository,
            settings.exercise_count(),
        );

        Self {
            inner: Arc::new(InnerState {
                settings,
                rubric,
                session,
                claims,
                transitions,
                stats: RunStats::default(),
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn rubric(&self) -> &RubricAccessCoordinator {
        &self.inner.rubric
    }

    pub(crate) fn session(&self) -> &ExamSession {
        &self.inner.session
    }

    pub(crate) fn claims(&self) -> &ExamClaimCoordinator {
        &self.inner.claims
    }

    pub(crate) fn transitions(&self) -> &ExamTransitionCoordinator {
        &self.inner.transitions
    }

    pub(crate) fn stats(&self) -> &RunStats {
        &self.inner.stats
    }

    /// Fails every pending and future acquisition of the blocking primitives so
    /// no worker can wait forever on a hold abandoned by a failed peer.
    pub(crate) fn close_primitives(&self) {
        self.inner.rubric.close();
    }
}
