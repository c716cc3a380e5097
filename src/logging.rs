//! Debug and crash logs in the temp directory.
//!
//! The debug log keeps at most two generations: when `loopavatar.log` would
//! exceed its cap it is renamed to `loopavatar.log.1` and a fresh file starts.

use crate::config::AppConfig;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_MAX_BYTES: u64 = 4 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;

static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: OnceLock<Mutex<Option<RotatingLog>>> = OnceLock::new();

pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("loopavatar.log")
}

pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("loopavatar_crash.log")
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// Append-only file that rolls over to a single backup once it reaches its cap.
struct RotatingLog {
    path: PathBuf,
    file: File,
    cap: u64,
    len: u64,
}

impl RotatingLog {
    fn open(path: PathBuf, cap: u64) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let mut log = Self {
            path,
            file,
            cap,
            len,
        };
        if log.len > cap {
            log.roll()?;
        }
        Ok(log)
    }

    fn roll(&mut self) -> io::Result<()> {
        let backup = backup_path(&self.path);
        // Renaming an open file is fine on unix; elsewhere fall back to truncating.
        if fs::rename(&self.path, &backup).is_err() {
            let _ = fs::remove_file(&self.path);
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.len = 0;
        Ok(())
    }

    fn append(&mut self, line: &str) {
        let next = self.len.saturating_add(line.len() as u64);
        if next > self.cap && self.len > 0 && self.roll().is_err() {
            return;
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.len = self.len.saturating_add(line.len() as u64);
        }
    }
}

fn debug_log() -> &'static Mutex<Option<RotatingLog>> {
    DEBUG_LOG.get_or_init(|| Mutex::new(None))
}

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", now.as_secs(), now.subsec_millis())
}

/// Enable file logging when `--logs` is set and `--no-logs` is not.
pub fn init_logging(config: &AppConfig) {
    let enabled = config.logs && !config.no_logs;
    let writer = if enabled {
        RotatingLog::open(log_file_path(), LOG_MAX_BYTES).ok()
    } else {
        None
    };
    LOG_ENABLED.store(writer.is_some(), Ordering::Relaxed);
    // The logger's own lock cannot go through lock_or_recover, which logs.
    *debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = writer;
}

pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", timestamp());
    let mut guard = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(log) = guard.as_mut() {
        log.append(&line);
    }
}

fn panic_payload(info: &panic::PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Record a panic from any thread in the crash log. Always on, independent of
/// `--logs`.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    let location = info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "unknown location".to_string());
    let current = thread::current();
    let thread_name = current.name().unwrap_or("unnamed");
    let line = format!(
        "[{}] loopavatar {} panicked on thread '{thread_name}' at {location}: {}\n",
        timestamp(),
        env!("CARGO_PKG_VERSION"),
        panic_payload(info)
    );
    if let Ok(mut log) = RotatingLog::open(crash_log_path(), CRASH_LOG_MAX_BYTES) {
        log.append(&line);
    }
}
