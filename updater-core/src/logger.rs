//! Tracing setup shared by the updater binaries: stdout plus an append-only log file.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::FmtSpan, fmt::writer::MakeWriterExt, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Registry,
};

/// Used when `RUST_LOG` is unset or unparsable. The NATS client and the HTTP stack under teloxide
/// log every reconnect and request at info, so they are held at warn.
pub const DEFAULT_LOG_DIRECTIVES: &str =
    "info,async_nats=warn,reqwest=warn,hyper=warn,hyper_util=warn";

/// Builds the filter from a `RUST_LOG`-style string, falling back to [`DEFAULT_LOG_DIRECTIVES`].
pub fn build_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

/// Opens `path` for appending, creating missing parent directories.
pub fn open_log_file(path: impl AsRef<Path>) -> io::Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber writing to stdout and `log_file_path`.
///
/// Reads `RUST_LOG`; load `.env` first so it applies. Span close events are logged so the
/// `initialize`/`shutdown`/poll spans show their duration.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    let file = Arc::new(open_log_file(log_file_path)?);
    let filter = build_filter(env::var("RUST_LOG").ok().as_deref());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout.and(file))
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}
