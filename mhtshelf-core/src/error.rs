use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures raised by library lifecycle operations.
///
/// Scanning never produces these; a folder that cannot be read is skipped.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("name already exists: {0}")]
    NameConflict(String),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("cannot capture page: {0}")]
    Capture(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode {0}")]
    Encode(#[from] crate::binfmt::FormatError),

    #[error("invalid sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LibraryError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T, E = LibraryError> = std::result::Result<T, E>;

/// Failure reported by an external collaborator (capture engine, OCR,
/// language identification, translation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
