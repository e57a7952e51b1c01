use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::core::errors::MarkingError;
use crate::core::state::AppState;
use crate::models::WorkerId;
use crate::services::stats::RunSummary;
use crate::tasks::marking::{MarkingWorker, WorkerExit};

/// Runs `worker_count` TAs until every one has left its loop.
///
/// The first worker error, worker panic or termination signal stops the run:
/// shutdown is broadcast, blocking primitives are closed so nobody waits on a
/// hold its owner abandoned, and that first cause is returned once all
/// workers have been joined.
pub(crate) async fn run(state: AppState, worker_count: usize) -> Result<RunSummary, MarkingError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = JoinSet::new();

    for id in 1..=worker_count {
        let worker = MarkingWorker::new(WorkerId::new(id), state.clone(), shutdown_rx.clone());
        workers.spawn(worker.run().instrument(tracing::info_span!("worker", id)));
    }
    tracing::info!(
        workers = worker_count,
        mode = state.settings().sync_mode().as_str(),
        "Marking started"
    );

    let interrupt = crate::core::shutdown::interrupt_signal();
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut failure: Option<MarkingError> = None;

    loop {
        tokio::select! {
            joined = workers.join_next() => {
                let Some(joined) = joined else { break };
                match joined {
                    Ok(Ok(exit)) => log_exit(exit),
                    Ok(Err(err)) => abort_run(&state, &shutdown_tx, &mut failure, err),
                    Err(err) => abort_run(
                        &state,
                        &shutdown_tx,
                        &mut failure,
                        MarkingError::WorkerPanicked { detail: err.to_string() },
                    ),
                }
            }
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                abort_run(&state, &shutdown_tx, &mut failure, MarkingError::Interrupted { signal });
            }
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }

    let last_exam_index = state.session().snapshot().await.exam_index();
    Ok(state.stats().summary(last_exam_index))
}

fn log_exit(exit: WorkerExit) {
    tracing::debug!(exit = exit.as_str(), "Worker joined");
}

fn abort_run(
    state: &AppState,
    shutdown_tx: &watch::Sender<bool>,
    failure: &mut Option<MarkingError>,
    cause: MarkingError,
) {
    if failure.is_some() {
        tracing::debug!(error = %cause, "Worker stopped during shutdown");
        return;
    }

    tracing::error!(error = %cause, "Marking aborted, stopping all workers");
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to workers");
    }
    state.close_primitives();
    *failure = Some(cause);
}
