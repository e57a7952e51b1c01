use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const QUESTIONS_MARKED: &str = "questions_marked_total";
pub(crate) const RUBRIC_CORRECTIONS: &str = "rubric_corrections_total";
pub(crate) const EXAM_TRANSITIONS: &str = "exam_transitions_total";
pub(crate) const CLAIM_BACKOFFS: &str = "claim_backoffs_total";

/// Installs an in-process Prometheus recorder. There is no scrape endpoint;
/// the snapshot is logged once marking finishes.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);

    metrics::describe_counter!(QUESTIONS_MARKED, "Questions moved from claimed to marked");
    metrics::describe_counter!(RUBRIC_CORRECTIONS, "Rubric entries corrected and saved");
    metrics::describe_counter!(EXAM_TRANSITIONS, "Fully marked exams replaced by the next one");
    metrics::describe_counter!(CLAIM_BACKOFFS, "Rounds that found nothing to claim");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
