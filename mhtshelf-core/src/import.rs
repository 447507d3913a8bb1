use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::entry::{LibraryEntry, sanitize_name};
use crate::error::{LibraryError, Result};
use crate::library::Library;
use crate::scanner;
use crate::sidecar::{self, DEFAULT_CONTENT_NAME, Sidecar};

pub const NATIVE_MIME_TYPE: &str = "multipart/related";

/// Content handed to the library from outside: a picked file, a shared
/// document, anything the host can resolve to bytes.
pub trait ImportSource {
    /// Stable reference recorded in the sidecar. Never modified.
    fn reference(&self) -> String;

    fn display_name(&self) -> Option<String>;

    fn mime_type(&self) -> Option<String>;

    fn open(&self) -> io::Result<Box<dyn Read + '_>>;
}

/// An import source backed by a local file path.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = fs::canonicalize(&path).unwrap_or(path);
        Self { path }
    }
}

impl ImportSource for FileSource {
    fn reference(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn display_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
    }

    fn mime_type(&self) -> Option<String> {
        let ext = self.path.extension()?.to_string_lossy().to_ascii_lowercase();
        let mime = match ext.as_str() {
            "mht" | "mhtml" => NATIVE_MIME_TYPE,
            "html" | "htm" => "text/html",
            _ => return None,
        };
        Some(mime.to_string())
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub entry: LibraryEntry,
    /// False when the source was registered by reference.
    pub copied: bool,
}

/// True when the source is already an MHTML archive, judged by MIME type or
/// by the display name's extension (compared case-insensitively).
pub fn is_native_format(source: &dyn ImportSource, extensions: &[String]) -> bool {
    if source
        .mime_type()
        .is_some_and(|m| m.eq_ignore_ascii_case(NATIVE_MIME_TYPE))
    {
        return true;
    }
    let Some(name) = source.display_name() else {
        return false;
    };
    let name = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

impl Library {
    /// Adds external content to the library.
    ///
    /// Archives already in the native format are registered by reference in a
    /// `link-<name>` folder; anything else is copied into a fresh
    /// `imported-<timestamp>` folder. A failed copy leaves no folder behind.
    pub fn import(&self, source: &dyn ImportSource, native_extensions: &[String]) -> Result<ImportOutcome> {
        if is_native_format(source, native_extensions) {
            self.register_reference(source)
        } else {
            self.copy_in(source)
        }
    }

    fn register_reference(&self, source: &dyn ImportSource) -> Result<ImportOutcome> {
        let reference = source.reference();
        let name = source
            .display_name()
            .map(|n| sanitize_name(n.trim()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "external".to_string());
        let dir = self.link_folder(&format!("link-{name}"), &reference);
        let existed = dir.is_dir();
        fs::create_dir_all(&dir).map_err(|e| LibraryError::io(&dir, e))?;

        let title = source.display_name().unwrap_or_default();
        Sidecar::new(&reference, &reference, &title, sidecar::now_millis()).write_to(&dir)?;

        let entry = scanner::resolve_folder(&dir).ok_or_else(|| {
            if !existed {
                let _ = fs::remove_dir_all(&dir);
            }
            LibraryError::NotFound(reference.clone())
        })?;
        info!(folder = %entry.folder_id, reference = %reference, "registered archive by reference");
        Ok(ImportOutcome {
            entry,
            copied: false,
        })
    }

    /// Folder for a by-reference link: `stem` when free or already linking
    /// `reference`, else the first free `stem-2`, `stem-3`, ...
    fn link_folder(&self, stem: &str, reference: &str) -> PathBuf {
        let mut n = 1;
        loop {
            let name = if n == 1 {
                stem.to_string()
            } else {
                format!("{stem}-{n}")
            };
            let dir = self.folder_path(&name);
            if !dir.exists() || links_to(&dir, reference) {
                return dir;
            }
            debug!(folder = %name, "link folder taken by another reference");
            n += 1;
        }
    }

    fn copy_in(&self, source: &dyn ImportSource) -> Result<ImportOutcome> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let (_, dir) = self.create_unique_folder(&format!("imported-{stamp}"))?;

        match write_copy(source, &dir) {
            Ok(entry) => {
                info!(folder = %entry.folder_id, reference = %source.reference(), "imported copy");
                Ok(ImportOutcome {
                    entry,
                    copied: true,
                })
            }
            Err(err) => {
                let _ = fs::remove_dir_all(&dir);
                Err(err)
            }
        }
    }
}

fn links_to(dir: &Path, reference: &str) -> bool {
    sidecar::locate(dir)
        .and_then(|path| Sidecar::load(&path).ok())
        .and_then(|meta| meta.saved_path)
        .is_some_and(|saved| saved == reference)
}

fn write_copy(source: &dyn ImportSource, dir: &Path) -> Result<LibraryEntry> {
    let page = dir.join(DEFAULT_CONTENT_NAME);
    let part = dir.join(format!("{DEFAULT_CONTENT_NAME}.part"));
    let reference = source.reference();

    let mut reader = source.open().map_err(|e| LibraryError::io(Path::new(&reference), e))?;
    let file = File::create(&part).map_err(|e| LibraryError::io(&part, e))?;
    let mut writer = BufWriter::new(file);
    io::copy(&mut reader, &mut writer).map_err(|e| LibraryError::io(&part, e))?;
    writer.flush().map_err(|e| LibraryError::io(&part, e))?;
    drop(writer);
    fs::rename(&part, &page).map_err(|e| LibraryError::io(&page, e))?;

    let title = source.display_name().unwrap_or_default();
    Sidecar::new(&reference, &page.to_string_lossy(), &title, sidecar::now_millis())
        .write_to(dir)?;

    scanner::resolve_folder(dir).ok_or_else(|| LibraryError::NotFound(page.display().to_string()))
}
