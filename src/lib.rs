pub mod audio;
pub mod config;
pub mod driver;
pub mod filters;
mod lock;
mod logging;
pub mod rules;
pub mod state;
mod telemetry;
pub mod video;

pub(crate) use lock::lock_or_recover;
pub use logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use telemetry::init_tracing;
