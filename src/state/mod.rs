//! Reactive avatar states and their transitions.

mod assets;
mod machine;
mod table;
#[cfg(test)]
mod tests;

pub use assets::{is_video_file, load_assets, resolve_request, scan_state_dir, VIDEO_EXTENSIONS};
pub use machine::StateMachine;
pub use table::{StateDef, StateTable, Transition, VideoPolicy};
