//! Log sink setup.
//!
//! catrig itself only emits `tracing` events; applications decide where they
//! go. [`subscriber`] builds the standard two-sink arrangement:
//!
//! - a persistent file sink that records everything from DEBUG up, without
//!   ANSI colour codes;
//! - an interactive stderr sink that shows WARN and above.
//!
//! Components do not reach for a global logger. Each rig and session is
//! handed a [`tracing::Span`] at construction and emits its events under it,
//! so every line carries the model name of the rig it came from.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{Error, Result};

/// Minimum level recorded by the persistent file sink.
pub const FILE_SINK_LEVEL: LevelFilter = LevelFilter::DEBUG;

/// Minimum level shown on the interactive stderr sink.
pub const CONSOLE_SINK_LEVEL: LevelFilter = LevelFilter::WARN;

/// Build a subscriber with a stderr sink and, if `log_file` is given, a file
/// sink appending to that path (created if missing).
pub fn subscriber(log_file: Option<PathBuf>) -> Result<impl Subscriber + Send + Sync> {
    let file_layer = match log_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(&path)?))
                .with_filter(FILE_SINK_LEVEL),
        ),
        None => None,
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(CONSOLE_SINK_LEVEL);

    Ok(tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer))
}

/// Install [`subscriber`] as the process-wide default.
///
/// Fails if a global subscriber has already been set.
pub fn init(log_file: Option<PathBuf>) -> Result<()> {
    subscriber(log_file)?
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialised: {e}")))
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Config(format!("cannot open log file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_captures_debug_and_above() {
        let path = std::env::temp_dir().join(format!(
            "catrig-logging-test-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let sub = subscriber(Some(path.clone())).unwrap();
        tracing::subscriber::with_default(sub, || {
            tracing::trace!("trace-line");
            tracing::debug!("debug-line");
            tracing::warn!("warn-line");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("trace-line"));
        assert!(contents.contains("debug-line"));
        assert!(contents.contains("warn-line"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn subscriber_without_file_sink() {
        assert!(subscriber(None).is_ok());
    }

    #[test]
    fn unwritable_log_path_is_config_error() {
        let path = std::env::temp_dir()
            .join("catrig-no-such-dir")
            .join("nested")
            .join("x.log");
        let err = subscriber(Some(path)).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
