use crate::config::AppConfig;
use std::env;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

const TRACE_LOG_ENV: &str = "LOOPAVATAR_TRACE_LOG";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub(crate) fn tracing_log_path() -> PathBuf {
    env::var_os(TRACE_LOG_ENV)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("loopavatar_trace.jsonl"))
}

pub(crate) fn tracing_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

fn open_trace_file(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(err) => {
            crate::log_debug(&format!("trace log '{}' unavailable: {err}", path.display()));
            None
        }
    }
}

/// Install the JSON trace subscriber once per process.
///
/// State switches, clip selections, listener connections and rule failures are
/// emitted as structured events into the trace file.
pub fn init_tracing(config: &AppConfig) {
    if !tracing_enabled(config) {
        return;
    }
    TRACING_INIT.get_or_init(|| {
        let Some(file) = open_trace_file(&tracing_log_path()) else {
            return;
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            crate::log_debug("trace subscriber already installed");
        }
    });
}
