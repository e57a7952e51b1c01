use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// `RUST_LOG` wins over `MARKING_LOG_LEVEL`. Thread ids are on so lock
/// hand-offs between runtime threads can be followed in the output; each
/// worker span logs once when its TA leaves the loop.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&telemetry.log_level).map_err(|err| {
            anyhow::anyhow!("invalid MARKING_LOG_LEVEL {:?}: {err}", telemetry.log_level)
        })?,
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE);

    let installed = if telemetry.json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| anyhow::anyhow!(err.to_string()))
}
