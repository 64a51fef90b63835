//! Run log: every event goes to stderr and to a per-run file as
//! `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{DeployError, DeployResult};

/// Event formatter producing `[timestamp] [LEVEL] message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        write!(writer, "[{now}] [{}] ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File name of the log for a run started at `started`.
#[must_use]
pub fn log_file_name(started: &DateTime<Local>) -> String {
    format!("deploy_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber. Returns the path of the log file.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(log_dir: &Path) -> DeployResult<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let file_name = log_file_name(&Local::now());
    let appender = tracing_appender::rolling::never(log_dir, &file_name);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tfmt::layer().event_format(LineFormat).with_writer(std::io::stderr))
        .with(
            tfmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(appender),
        )
        .try_init()
        .map_err(|e| DeployError::Other(format!("logging setup failed: {e}")))?;

    Ok(log_dir.join(file_name))
}
