use std::io;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{PaneError, Result};

pub const LOG_FILE: &str = "issuepane.log";

/// Where the log file lives: `<config dir>/issuepane`.
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("issuepane"))
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .map_err(|e| PaneError::Io(io::Error::other(e)))
}

/// The only layer writes to `writer`. The terminal belongs to the UI, so
/// nothing here touches stdout or stderr.
fn subscriber(writer: NonBlocking, filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false),
    )
}

/// Install the global subscriber, appending to `<dir>/issuepane.log`.
/// `RUST_LOG` overrides the default `warn` level. Buffered lines are flushed
/// when the returned guard drops.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender(dir)?);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    subscriber(writer, filter).init();
    Ok(guard)
}
