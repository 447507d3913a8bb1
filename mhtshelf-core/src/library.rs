//! Archive lifecycle operations on the library base directory: open,
//! rename and delete. Capture and import live in their own modules.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::entry::{LibraryEntry, sanitize_name};
use crate::error::{LibraryError, Result};
use crate::scanner;
use crate::sidecar::{self, Sidecar};

#[derive(Debug, Clone)]
pub struct Library {
    base: PathBuf,
}

/// Where an open request points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "location")]
pub enum OpenTarget {
    Local(PathBuf),
    External(String),
}

/// Request handed to the viewer screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    pub target: OpenTarget,
    /// Disables navigation and editing in the viewer.
    pub read_only: bool,
}

impl OpenRequest {
    /// Builds a request for an arbitrary path or external reference, such as
    /// one handed over by the host environment.
    pub fn from_reference(reference: &str, read_only: bool) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LibraryError::NotFound("missing path".to_string()));
        }
        if crate::entry::is_external_reference(reference) {
            return Ok(Self {
                target: OpenTarget::External(reference.to_string()),
                read_only,
            });
        }
        let path = PathBuf::from(reference.strip_prefix("file://").unwrap_or(reference));
        if !path.is_file() {
            return Err(LibraryError::NotFound(path.display().to_string()));
        }
        Ok(Self {
            target: OpenTarget::Local(path),
            read_only,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub folder_id: String,
    pub content_path: String,
}

/// Aggregate result of a multi-entry delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl DeleteReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!("Deleted {} item(s)", self.deleted.len())
        } else {
            format!("Some deletes failed: {}", self.failed.join(", "))
        }
    }
}

impl Library {
    /// A relative `base` is anchored to the current directory so that
    /// content paths written to sidecars stay valid from anywhere.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let base = std::path::absolute(&base).unwrap_or(base);
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn folder_path(&self, folder_id: &str) -> PathBuf {
        self.base.join(folder_id)
    }

    pub fn scan(&self) -> Vec<LibraryEntry> {
        scanner::scan_library(&self.base)
    }

    pub fn find(&self, folder_id: &str) -> Option<LibraryEntry> {
        scanner::resolve_folder(&self.folder_path(folder_id))
    }

    pub fn open(&self, entry: &LibraryEntry, read_only: bool) -> Result<OpenRequest> {
        OpenRequest::from_reference(&entry.content_path, read_only)
    }

    /// Renames an entry to `new_name`.
    ///
    /// The folder becomes the sanitized name. When the content file lives in
    /// the folder it is renamed to `<name>.mht` and the sidecar is rewritten
    /// with the new title and path. Entries without a folder get a fresh one.
    pub fn rename(&self, entry: &LibraryEntry, new_name: &str) -> Result<RenameOutcome> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        let safe = sanitize_name(new_name);
        let old_dir = self.folder_path(&entry.folder_id);
        let new_dir = self.folder_path(&safe);
        if new_dir.exists() {
            return Err(LibraryError::NameConflict(safe));
        }

        let outcome = if old_dir.is_dir() {
            self.move_folder(entry, &old_dir, &new_dir, new_name, &safe)?
        } else {
            self.adopt_external(entry, &new_dir, new_name, &safe)?
        };
        info!(from = %entry.folder_id, to = %outcome.folder_id, "renamed entry");
        Ok(outcome)
    }

    fn move_folder(
        &self,
        entry: &LibraryEntry,
        old_dir: &Path,
        new_dir: &Path,
        title: &str,
        safe: &str,
    ) -> Result<RenameOutcome> {
        fs::rename(old_dir, new_dir).map_err(|e| LibraryError::io(old_dir, e))?;

        let mut meta = sidecar::locate(new_dir)
            .and_then(|p| Sidecar::load(&p).ok())
            .unwrap_or_else(|| {
                Sidecar::new(&entry.source_url, &entry.content_path, "", entry.timestamp)
            });

        let mut content_path = entry.content_path.clone();
        if let Ok(inner) = Path::new(&entry.content_path).strip_prefix(old_dir) {
            let moved = new_dir.join(inner);
            let file_name = if safe.ends_with(".mht") {
                safe.to_string()
            } else {
                format!("{safe}.mht")
            };
            let renamed = new_dir.join(file_name);
            content_path = moved.to_string_lossy().to_string();
            if moved != renamed && !renamed.exists() {
                match fs::rename(&moved, &renamed) {
                    Ok(()) => content_path = renamed.to_string_lossy().to_string(),
                    Err(err) => {
                        warn!(path = %moved.display(), error = %err, "content file kept its name")
                    }
                }
            }
        }

        meta.title = title.to_string();
        meta.saved_path = Some(content_path.clone());
        if let Err(err) = meta.write_to(new_dir) {
            self.roll_back(entry, old_dir, new_dir, &content_path);
            return Err(err);
        }

        Ok(RenameOutcome {
            folder_id: safe.to_string(),
            content_path,
        })
    }

    fn roll_back(&self, entry: &LibraryEntry, old_dir: &Path, new_dir: &Path, current: &str) {
        let current = Path::new(current);
        if current.starts_with(new_dir) {
            if let Some(original) = Path::new(&entry.content_path).file_name() {
                let target = new_dir.join(original);
                if current != target {
                    let _ = fs::rename(current, target);
                }
            }
        }
        if let Err(err) = fs::rename(new_dir, old_dir) {
            warn!(folder = %new_dir.display(), error = %err, "could not roll back rename");
        }
    }

    fn adopt_external(
        &self,
        entry: &LibraryEntry,
        new_dir: &Path,
        title: &str,
        safe: &str,
    ) -> Result<RenameOutcome> {
        fs::create_dir_all(new_dir).map_err(|e| LibraryError::io(new_dir, e))?;
        let meta = Sidecar::new(
            &entry.source_url,
            &entry.content_path,
            title,
            sidecar::now_millis(),
        );
        if let Err(err) = meta.write_to(new_dir) {
            let _ = fs::remove_dir_all(new_dir);
            return Err(err);
        }
        Ok(RenameOutcome {
            folder_id: safe.to_string(),
            content_path: entry.content_path.clone(),
        })
    }

    /// Deletes every entry's folder, continuing past failures.
    ///
    /// Only the library's own folders are removed; external originals an
    /// entry refers to are never touched.
    pub fn delete(&self, entries: &[LibraryEntry]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for entry in entries {
            match self.delete_one(entry) {
                Ok(()) => report.deleted.push(entry.folder_id.clone()),
                Err(err) => {
                    warn!(folder = %entry.folder_id, error = %err, "delete failed");
                    report.failed.push(entry.folder_id.clone());
                }
            }
        }
        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "delete finished"
        );
        report
    }

    fn delete_one(&self, entry: &LibraryEntry) -> Result<()> {
        if !is_plain_folder_name(&entry.folder_id) {
            return Err(LibraryError::NotFound(entry.folder_id.clone()));
        }
        let dir = self.folder_path(&entry.folder_id);
        if dir.is_dir() {
            return fs::remove_dir_all(&dir).map_err(|e| LibraryError::io(&dir, e));
        }
        match sidecar::locate(&dir) {
            Some(meta) => fs::remove_file(&meta).map_err(|e| LibraryError::io(&meta, e)),
            None => Err(LibraryError::io(
                &dir,
                io::Error::new(io::ErrorKind::NotFound, "folder is missing"),
            )),
        }
    }

    /// Creates a fresh folder named `stem`, or `stem-2`, `stem-3`, ... when
    /// taken.
    pub(crate) fn create_unique_folder(&self, stem: &str) -> Result<(String, PathBuf)> {
        fs::create_dir_all(&self.base).map_err(|e| LibraryError::io(&self.base, e))?;
        let mut n = 1;
        loop {
            let name = if n == 1 {
                stem.to_string()
            } else {
                format!("{stem}-{n}")
            };
            let dir = self.folder_path(&name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((name, dir)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(LibraryError::io(&dir, e)),
            }
        }
    }
}

/// A single path component that stays inside the base directory.
fn is_plain_folder_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
