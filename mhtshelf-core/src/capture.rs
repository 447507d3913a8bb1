use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};
use url::Url;

use crate::entry::{LibraryEntry, sanitize_name};
use crate::error::{CollaboratorError, LibraryError, Result};
use crate::library::Library;
use crate::scanner;
use crate::sidecar::{self, DEFAULT_CONTENT_NAME, Sidecar};

/// A capture waiting for the page renderer to write its archive.
///
/// The folder exists but has no sidecar, so the scanner ignores it until
/// [`PendingCapture::finish`] succeeds.
#[derive(Debug)]
pub struct PendingCapture {
    folder_id: String,
    dir: PathBuf,
    archive_path: PathBuf,
    source_url: String,
    title: String,
}

impl Library {
    /// Reserves a folder for capturing `source_url`.
    pub fn prepare_capture(&self, source_url: &str, title: &str) -> Result<PendingCapture> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(LibraryError::Capture("no URL loaded".to_string()));
        }
        let parsed = Url::parse(source_url).ok();
        if parsed.as_ref().is_some_and(|u| u.scheme() == "file") {
            return Err(LibraryError::Capture(
                "saving local files (file://) is not supported".to_string(),
            ));
        }

        let host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .map(sanitize_name)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "page".to_string());
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let (folder_id, dir) = self.create_unique_folder(&format!("{host}-{stamp}"))?;
        let archive_path = dir.join(DEFAULT_CONTENT_NAME);

        let title = title.trim();
        Ok(PendingCapture {
            folder_id,
            dir,
            archive_path,
            source_url: source_url.to_string(),
            title: if title.is_empty() {
                "Untitled".to_string()
            } else {
                title.to_string()
            },
        })
    }
}

impl PendingCapture {
    /// Where the renderer must write the archive.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Completes the capture with the renderer's outcome.
    ///
    /// On success the sidecar is written and the new entry returned. On any
    /// failure the reserved folder is removed and nothing is indexed.
    pub fn finish(self, outcome: std::result::Result<(), CollaboratorError>) -> Result<LibraryEntry> {
        if let Err(err) = outcome {
            self.discard();
            return Err(LibraryError::Capture(err.0));
        }
        if !self.archive_path.is_file() {
            self.discard();
            return Err(LibraryError::Capture("no archive was produced".to_string()));
        }

        let meta = Sidecar::new(
            &self.source_url,
            &self.archive_path.to_string_lossy(),
            &self.title,
            sidecar::now_millis(),
        );
        if let Err(err) = meta.write_to(&self.dir) {
            self.discard();
            return Err(err);
        }

        let entry = scanner::resolve_folder(&self.dir)
            .ok_or_else(|| LibraryError::NotFound(self.archive_path.display().to_string()))?;
        info!(folder = %self.folder_id, url = %self.source_url, "page captured");
        Ok(entry)
    }

    /// Drops the reserved folder without indexing anything.
    pub fn abandon(self) {
        self.discard();
    }

    fn discard(&self) {
        if let Err(err) = fs::remove_dir_all(&self.dir) {
            warn!(folder = %self.dir.display(), error = %err, "could not remove capture folder");
        }
    }
}
