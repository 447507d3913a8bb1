use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::binfmt::{self, FormatError};
use crate::config::Config;
use crate::error::{LibraryError, Result};
use crate::sort::SortOrder;

const PREFS_MAGIC: [u8; 4] = *b"MSPF";
const PREFS_VERSION_V1: u32 = 1;
const PREFS_VERSION_V2: u32 = 2;

/// Process-wide preferences that change from inside the app rather than
/// through the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Prefs {
    pub sort: Option<SortOrder>,
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct PrefsV1 {
    sort: SortOrder,
}

impl Prefs {
    pub fn path() -> Option<PathBuf> {
        Config::config_dir().map(|p| p.join("prefs.bin"))
    }

    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(bytes) = fs::read(path) else {
            return Self::default();
        };
        match decode(&bytes) {
            Ok(prefs) => prefs,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "ignoring unreadable prefs");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| LibraryError::NotFound("config directory".to_string()))?;
        self.save_to(&path)
    }

    /// Writes through a temp file; on failure the previous file is untouched.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| LibraryError::io(dir, e))?;
        }
        let bytes = binfmt::encode(PREFS_MAGIC, PREFS_VERSION_V2, self)?;
        let tmp_path = path.with_extension("bin.tmp");
        let written = fs::write(&tmp_path, &bytes).and_then(|_| fs::rename(&tmp_path, path));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(LibraryError::io(path, err));
        }
        Ok(())
    }

    /// Stored sort order, or the configured default.
    pub fn sort_or(&self, fallback: SortOrder) -> SortOrder {
        self.sort.unwrap_or(fallback)
    }

    pub fn target_language_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.target_language.as_deref().unwrap_or(fallback)
    }
}

fn decode(bytes: &[u8]) -> std::result::Result<Prefs, FormatError> {
    let (version, _) = binfmt::split_header(bytes, PREFS_MAGIC)?;
    match version {
        PREFS_VERSION_V2 => binfmt::decode(bytes, PREFS_MAGIC, PREFS_VERSION_V2),
        // v1 stored the sort order only.
        PREFS_VERSION_V1 => binfmt::decode::<PrefsV1>(bytes, PREFS_MAGIC, PREFS_VERSION_V1).map(|v1| Prefs {
            sort: Some(v1.sort),
            target_language: None,
        }),
        other => Err(FormatError::Version(other)),
    }
}
