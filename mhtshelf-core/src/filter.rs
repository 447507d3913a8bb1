use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};

use crate::entry::LibraryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Prefix,
    #[default]
    Substring,
    Fuzzy,
}

/// Trims, lowercases and collapses runs of whitespace to one space.
pub fn normalize_query(query: &str) -> String {
    let mut out = String::new();
    let mut prev_space = false;

    for ch in query.trim().chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            prev_space = false;
        }
    }

    out
}

/// Keeps the entries whose display title (or folder id) matches `query`,
/// preserving their order. An empty query keeps everything.
pub fn filter_entries(entries: &[LibraryEntry], query: &str, mode: FilterMode) -> Vec<LibraryEntry> {
    let query = normalize_query(query);
    if query.is_empty() {
        return entries.to_vec();
    }
    let matcher = SkimMatcherV2::default();
    entries
        .iter()
        .filter(|e| {
            matches(&matcher, &e.display_title().to_lowercase(), &query, mode)
                || matches(&matcher, &e.folder_id.to_lowercase(), &query, mode)
        })
        .cloned()
        .collect()
}

fn matches(matcher: &SkimMatcherV2, name: &str, query: &str, mode: FilterMode) -> bool {
    match mode {
        FilterMode::Prefix => name.starts_with(query),
        FilterMode::Substring => name.contains(query),
        FilterMode::Fuzzy => matcher.fuzzy_match(name, query).is_some(),
    }
}
