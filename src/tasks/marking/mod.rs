mod worker;

pub(crate) use worker::{MarkingWorker, WorkerExit};
