use std::path::Path;

use serde::{Deserialize, Serialize};

/// One saved archive as seen by the most recent scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    /// Name of the backing folder under the library base directory.
    pub folder_id: String,
    pub title: String,
    pub source_url: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Absolute file path, or an opaque external reference such as
    /// `content://...`.
    pub content_path: String,
}

impl LibraryEntry {
    /// Title to show in listings: the title when set, else the folder id.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.folder_id
        } else {
            &self.title
        }
    }

    pub fn is_external(&self) -> bool {
        is_external_reference(&self.content_path)
    }

    /// Base name offered when renaming: the content file name without its
    /// `.mht` extension, or the folder id for external references.
    pub fn rename_base(&self) -> String {
        if self.is_external() {
            return self.folder_id.clone();
        }
        let name = Path::new(&self.content_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match name.strip_suffix(".mht") {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ if name.is_empty() => self.folder_id.clone(),
            _ => name,
        }
    }
}

/// True when `reference` carries a URI scheme other than `file`, i.e. it
/// points at content owned by the host environment rather than a local path.
pub fn is_external_reference(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once("://") else {
        return false;
    };
    let valid_scheme = scheme.len() > 1
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid_scheme && !scheme.eq_ignore_ascii_case("file")
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
