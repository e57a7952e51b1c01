use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::models::ExamRecord;

/// The current exam, guarded by the exam-state mutex.
///
/// `progress` is signalled whenever a question completes or the exam changes,
/// so idle workers can retry before their backoff expires.
pub(crate) struct ExamSession {
    current: Mutex<ExamRecord>,
    progress: Notify,
}

impl ExamSession {
    pub(crate) fn new(first: ExamRecord) -> Self {
        Self { current: Mutex::new(first), progress: Notify::new() }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ExamRecord> {
        self.current.lock().await
    }

    pub(crate) async fn student_id(&self) -> i64 {
        self.current.lock().await.student_id()
    }

    pub(crate) async fn snapshot(&self) -> ExamRecord {
        self.current.lock().await.clone()
    }

    pub(crate) fn notify_progress(&self) {
        self.progress.notify_waiters();
    }

    pub(crate) async fn progressed(&self) {
        self.progress.notified().await;
    }
}
