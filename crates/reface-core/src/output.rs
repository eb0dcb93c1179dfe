//! Output discovery: locate the newest image the external tool produced.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extensions recognized as tool output.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Return the image file with the greatest modification time in `dir`.
///
/// Best-effort by design: an empty directory, a directory with no
/// recognized image extensions, or an unreadable/missing directory all
/// yield `None`. Read failures are logged and never propagated.
///
/// Timestamp inference is racy under concurrent writers; callers are
/// expected to serialize invocations against one output directory.
pub fn find_latest_image(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "output directory scan failed");
            return None;
        }
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_image(&path) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    newest.map(|(_, path)| path)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
