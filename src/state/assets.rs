//! Per-state clip discovery and request-token resolution.

use super::StateTable;
use crate::log_debug;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

pub fn is_video_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };
    VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Video files directly inside `dir`, sorted by path. Subdirectories are not
/// searched.
pub fn scan_state_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("cannot read asset folder {}", dir.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_video_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Fill every state's asset list from `<root>/<state name>/`.
///
/// A missing or unreadable folder leaves that state with no clips.
pub fn load_assets(table: &mut StateTable, root: &Path) {
    for state in table.states_mut() {
        let dir = root.join(&state.name);
        state.assets = match scan_state_dir(&dir) {
            Ok(files) => files,
            Err(err) => {
                log_debug(&format!("state '{}': {err:#}", state.name));
                tracing::warn!(state = %state.name, error = %format!("{err:#}"), "asset folder missing");
                eprintln!("Warning: no videos for state '{}' ({err:#})", state.name);
                Vec::new()
            }
        };
        log_debug(&format!(
            "state '{}': {} video(s) in {}",
            state.name,
            state.assets.len(),
            dir.display()
        ));
    }
}

/// Map a request token to a clip path.
///
/// Tokens match an asset by file stem (case-insensitive) or by exact file
/// name; anything else is taken as a literal path.
pub fn resolve_request(assets: &[PathBuf], token: &str) -> PathBuf {
    let token = token.trim();
    assets
        .iter()
        .find(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(token))
                || path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(|name| name == token)
        })
        .cloned()
        .unwrap_or_else(|| PathBuf::from(token))
}
