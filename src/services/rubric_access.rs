//! Reader-priority access to the shared rubric.
//!
//! Many workers may review the rubric at once; a correction needs the rubric
//! to itself. The reader count lives behind its own mutex so that "am I the
//! first/last reader" and taking/returning the writer-exclusion permit happen
//! as one step. A reader that wants to correct must release its read hold and
//! then request write access: there is no in-place upgrade.

use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::core::errors::MarkingError;
use crate::models::{RubricEdit, RubricLine, SyncMode, WorkerId};
use crate::repositories::rubric::RubricRepository;

const WRITER_EXCLUSION: &str = "rubric writer exclusion";
const RUBRIC_ENTRIES: &str = "rubric entries";

pub(crate) struct RubricAccessCoordinator {
    mode: SyncMode,
    readers: Mutex<usize>,
    writer: Semaphore,
    lines: RwLock<Vec<RubricLine>>,
    repository: Arc<dyn RubricRepository>,
}

#[must_use = "read holds must be handed back through release_read"]
#[derive(Debug)]
pub(crate) struct ReadHold {
    worker: WorkerId,
}

#[must_use = "write holds must be handed back through release_write"]
pub(crate) struct WriteHold<'a> {
    worker: WorkerId,
    _exclusive: Option<SemaphorePermit<'a>>,
}

impl RubricAccessCoordinator {
    pub(crate) fn new(
        mode: SyncMode,
        lines: Vec<RubricLine>,
        repository: Arc<dyn RubricRepository>,
    ) -> Self {
        Self {
            mode,
            readers: Mutex::new(0),
            writer: Semaphore::new(1),
            lines: RwLock::new(lines),
            repository,
        }
    }

    pub(crate) async fn acquire_read(&self, worker: WorkerId) -> Result<ReadHold, MarkingError> {
        tracing::debug!(worker = %worker, "Requesting rubric read access");

        let mut readers = self.readers.lock().await;
        if *readers == 0 && self.mode.is_coordinated() {
            // Taken on behalf of every reader that joins while the count stays above zero.
            self.writer.acquire().await.map_err(|_| MarkingError::sync(WRITER_EXCLUSION))?.forget();
            *readers = 1;
            tracing::debug!(worker = %worker, "Locked rubric for reading (first reader)");
        } else {
            *readers += 1;
            tracing::debug!(worker = %worker, readers = *readers, "Joined rubric reading");
        }

        Ok(ReadHold { worker })
    }

    pub(crate) async fn release_read(&self, hold: ReadHold) {
        let mut readers = self.readers.lock().await;
        debug_assert!(*readers > 0, "read hold released with no active readers");
        *readers -= 1;
        tracing::debug!(
            worker = %hold.worker,
            readers_remaining = *readers,
            "Released rubric read access"
        );

        if *readers == 0 && self.mode.is_coordinated() {
            self.writer.add_permits(1);
            tracing::debug!(worker = %hold.worker, "Unlocked rubric (last reader)");
        }
    }

    pub(crate) async fn acquire_write(&self, worker: WorkerId) -> Result<WriteHold<'_>, MarkingError> {
        tracing::debug!(worker = %worker, "Requesting rubric write access");

        let exclusive = if self.mode.is_coordinated() {
            Some(self.writer.acquire().await.map_err(|_| MarkingError::sync(WRITER_EXCLUSION))?)
        } else {
            None
        };

        tracing::debug!(worker = %worker, "Acquired rubric write lock");
        Ok(WriteHold { worker, _exclusive: exclusive })
    }

    pub(crate) fn release_write(&self, hold: WriteHold<'_>) {
        tracing::debug!(worker = %hold.worker, "Releasing rubric write lock");
        drop(hold);
    }

    pub(crate) fn entry(
        &self,
        _hold: &ReadHold,
        exercise: usize,
    ) -> Result<Option<RubricLine>, MarkingError> {
        let lines = self.lines.read().map_err(|_| MarkingError::sync(RUBRIC_ENTRIES))?;
        Ok(lines.get(exercise).cloned())
    }

    /// Applies the correction to `exercise` and persists the whole rubric while
    /// the write hold is still held. Returns `None` if the entry has no
    /// correctable value; nothing is saved in that case.
    pub(crate) async fn correct(
        &self,
        hold: &WriteHold<'_>,
        exercise: usize,
    ) -> Result<Option<RubricEdit>, MarkingError> {
        let (edit, label, snapshot) = {
            let mut lines = self.lines.write().map_err(|_| MarkingError::sync(RUBRIC_ENTRIES))?;
            let Some(line) = lines.get_mut(exercise) else {
                return Ok(None);
            };
            let Some(edit) = line.apply_correction(exercise) else {
                return Ok(None);
            };
            let label = line.label().unwrap_or_default().to_string();
            (edit, label, lines.clone())
        };

        tracing::info!(
            worker = %hold.worker,
            exercise = exercise + 1,
            label = %label,
            from = %edit.from,
            to = %edit.to,
            "Corrected rubric entry"
        );

        self.repository.save(&snapshot).await?;
        tracing::info!(
            worker = %hold.worker,
            location = %self.repository.location(),
            "Saved rubric"
        );

        Ok(Some(edit))
    }

    pub(crate) fn snapshot(&self) -> Result<Vec<RubricLine>, MarkingError> {
        let lines = self.lines.read().map_err(|_| MarkingError::sync(RUBRIC_ENTRIES))?;
        Ok(lines.clone())
    }

    pub(crate) fn close(&self) {
        self.writer.close();
    }
}
