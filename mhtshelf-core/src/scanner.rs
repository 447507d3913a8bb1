use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::entry::{LibraryEntry, is_external_reference};
use crate::sidecar::{self, DEFAULT_CONTENT_NAME, Sidecar};

/// Lists every archive folder directly under `base`, newest first.
///
/// Folders that are corrupt or have no locatable content are skipped; a
/// missing `base` yields an empty list.
pub fn scan_library(base: &Path) -> Vec<LibraryEntry> {
    let Ok(read_dir) = fs::read_dir(base) else {
        debug!(base = %base.display(), "library directory not readable");
        return Vec::new();
    };

    let mut entries: Vec<LibraryEntry> = read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|dir| resolve_folder(&dir))
        .collect();

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

/// Builds the entry for a single archive folder, or `None` when the folder
/// holds nothing that can be opened.
pub fn resolve_folder(dir: &Path) -> Option<LibraryEntry> {
    let folder_id = dir.file_name()?.to_string_lossy().to_string();

    let meta = sidecar::locate(dir).and_then(|path| match Sidecar::load(&path) {
        Ok(sc) => Some(sc),
        Err(err) => {
            debug!(folder = %folder_id, error = %err, "ignoring unreadable sidecar");
            None
        }
    });

    let from_sidecar = meta
        .as_ref()
        .and_then(|sc| sc.saved_path.as_deref())
        .and_then(|saved| resolve_saved_path(dir, saved));
    let content_path = match from_sidecar {
        Some(path) => path,
        None => {
            let page = dir.join(DEFAULT_CONTENT_NAME);
            if !page.is_file() {
                debug!(folder = %folder_id, "no content found, skipping");
                return None;
            }
            page.to_string_lossy().to_string()
        }
    };

    let timestamp = meta
        .as_ref()
        .and_then(|sc| sc.timestamp)
        .unwrap_or_else(|| folder_mtime(dir));
    let url = meta.as_ref().map(|sc| sc.url.clone()).unwrap_or_default();
    let title = meta
        .as_ref()
        .map(|sc| sc.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| derive_title(&folder_id, &content_path));

    Some(LibraryEntry {
        folder_id,
        title,
        source_url: url,
        timestamp,
        content_path,
    })
}

fn resolve_saved_path(dir: &Path, saved: &str) -> Option<String> {
    if is_external_reference(saved) {
        return Some(saved.to_string());
    }
    let local = saved.strip_prefix("file://").unwrap_or(saved);
    let mut path = PathBuf::from(local);
    if path.is_relative() {
        path = dir.join(path);
    }
    path.is_file().then(|| path.to_string_lossy().to_string())
}

fn derive_title(folder_id: &str, content_path: &str) -> String {
    if is_external_reference(content_path) {
        return folder_id.to_string();
    }
    Path::new(content_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| folder_id.to_string())
}

fn folder_mtime(dir: &Path) -> i64 {
    fs::metadata(dir)
        .and_then(|m| m.modified())
        .map(sidecar::system_time_millis)
        .unwrap_or_else(|_| sidecar::now_millis())
}
