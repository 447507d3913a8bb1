use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entry::LibraryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    NameAsc,
    TimeAsc,
    #[default]
    TimeDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "name_asc",
            SortOrder::TimeAsc => "time_asc",
            SortOrder::TimeDesc => "time_desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "name" | "name_asc" => Ok(SortOrder::NameAsc),
            "time_asc" | "oldest" => Ok(SortOrder::TimeAsc),
            "time" | "time_desc" | "newest" => Ok(SortOrder::TimeDesc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Sorts in place. The sort is stable, so applying the same order twice
/// leaves the list unchanged.
pub fn sort_entries(entries: &mut [LibraryEntry], order: SortOrder) {
    match order {
        SortOrder::NameAsc => entries.sort_by(compare_names),
        SortOrder::TimeAsc => entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        SortOrder::TimeDesc => entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }
}

fn compare_names(a: &LibraryEntry, b: &LibraryEntry) -> Ordering {
    let left = a.display_title().chars().flat_map(char::to_lowercase);
    let right = b.display_title().chars().flat_map(char::to_lowercase);
    left.cmp(right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(folder_id: &str, title: &str, timestamp: i64) -> LibraryEntry {
        LibraryEntry {
            folder_id: folder_id.to_string(),
            title: title.to_string(),
            source_url: String::new(),
            timestamp,
            content_path: format!("/lib/{folder_id}/page.mht"),
        }
    }

    fn ids(entries: &[LibraryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.folder_id.as_str()).collect()
    }

    #[test]
    fn name_sort_is_case_insensitive_and_uses_folder_fallback() {
        let mut entries = vec![
            entry("f1", "banana", 1),
            entry("Cherry", "", 2),
            entry("f3", "Apple", 3),
        ];
        sort_entries(&mut entries, SortOrder::NameAsc);
        assert_eq!(ids(&entries), vec!["f3", "f1", "Cherry"]);
    }

    #[test]
    fn name_sort_is_stable_for_equal_keys() {
        let mut entries = vec![
            entry("a", "Same", 1),
            entry("b", "same", 2),
            entry("c", "SAME", 3),
        ];
        sort_entries(&mut entries, SortOrder::NameAsc);
        assert_eq!(ids(&entries), vec!["a", "b", "c"]);
        sort_entries(&mut entries, SortOrder::NameAsc);
        assert_eq!(ids(&entries), vec!["a", "b", "c"]);
    }

    #[test]
    fn time_orders() {
        let mut entries = vec![entry("m", "", 200), entry("o", "", 100), entry("n", "", 300)];
        sort_entries(&mut entries, SortOrder::TimeAsc);
        assert_eq!(ids(&entries), vec!["o", "m", "n"]);
        sort_entries(&mut entries, SortOrder::TimeDesc);
        assert_eq!(ids(&entries), vec!["n", "m", "o"]);
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("name".parse::<SortOrder>(), Ok(SortOrder::NameAsc));
        assert_eq!("time-asc".parse::<SortOrder>(), Ok(SortOrder::TimeAsc));
        assert_eq!("TIME_DESC".parse::<SortOrder>(), Ok(SortOrder::TimeDesc));
        assert!("size".parse::<SortOrder>().is_err());
    }
}
