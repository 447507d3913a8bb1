pub mod binfmt;
pub mod capture;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod import;
pub mod library;
pub mod list;
pub mod overlay;
pub mod prefs;
pub mod scanner;
pub mod selection;
pub mod sidecar;
pub mod sort;

pub use entry::LibraryEntry;
pub use error::{CollaboratorError, LibraryError, Result};
pub use library::Library;
