//! The JSON metadata file stored next to each archive.
//!
//! Two generations of key spellings exist on disk (`url`/`uri`,
//! `savedPath`/`path`), so parsing goes through a loose `serde_json::Value`
//! instead of a derived struct. Unknown keys survive a rewrite.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::error::{LibraryError, Result};

pub const SIDECAR_NAME: &str = "meta.json";
pub const LEGACY_SIDECAR_NAME: &str = "metadata.json";
pub const DEFAULT_CONTENT_NAME: &str = "page.mht";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidecar {
    pub url: String,
    pub saved_path: Option<String>,
    pub title: String,
    pub timestamp: Option<i64>,
    extra: Map<String, Value>,
}

impl Sidecar {
    pub fn new(url: &str, saved_path: &str, title: &str, timestamp: i64) -> Self {
        Self {
            url: url.to_string(),
            saved_path: Some(saved_path.to_string()),
            title: title.to_string(),
            timestamp: Some(timestamp),
            extra: Map::new(),
        }
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|source| LibraryError::Sidecar {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Object(mut obj) = value else {
            return Err(LibraryError::Sidecar {
                path: path.to_path_buf(),
                source: <serde_json::Error as serde::de::Error>::custom(
                    "sidecar is not a JSON object",
                ),
            });
        };

        let url = take_string(&mut obj, &["url", "uri"]).unwrap_or_default();
        let saved_path = take_string(&mut obj, &["savedPath", "path"]).filter(|p| !p.is_empty());
        let title = take_string(&mut obj, &["title"]).unwrap_or_default();
        let timestamp = obj.remove("timestamp").and_then(|v| as_millis(&v));

        Ok(Self {
            url,
            saved_path,
            title,
            timestamp,
            extra: obj,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LibraryError::io(path, e))?;
        Self::parse(&text, path)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert("url".to_string(), Value::String(self.url.clone()));
        if let Some(path) = &self.saved_path {
            obj.insert("savedPath".to_string(), Value::String(path.clone()));
        }
        obj.insert("title".to_string(), Value::String(self.title.clone()));
        if let Some(ts) = self.timestamp {
            obj.insert("timestamp".to_string(), Value::from(ts));
        }
        Value::Object(obj)
    }

    /// Writes `meta.json` into `dir` through a temp file so a crash never
    /// leaves a truncated sidecar behind.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SIDECAR_NAME);
        let body = serde_json::to_string_pretty(&self.to_json()).map_err(|source| {
            LibraryError::Sidecar {
                path: path.clone(),
                source,
            }
        })?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, body).map_err(|e| LibraryError::io(&tmp_path, e))?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(LibraryError::io(&path, e));
        }
        Ok(path)
    }
}

/// First existing sidecar in `dir`: `meta.json`, then `metadata.json`.
pub fn locate(dir: &Path) -> Option<PathBuf> {
    [SIDECAR_NAME, LEGACY_SIDECAR_NAME]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

pub fn now_millis() -> i64 {
    system_time_millis(SystemTime::now())
}

pub fn system_time_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Removes every alias from `obj` and returns the value of the first one
/// present.
fn take_string(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        let value = obj.remove(*key).and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        });
        if found.is_none() {
            found = value;
        }
    }
    found
}

fn as_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
