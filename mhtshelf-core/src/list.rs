use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::entry::LibraryEntry;
use crate::selection::{SelectionListener, SelectionTracker};
use crate::sort::SortOrder;

/// Reactions the owner of a library list provides.
pub trait ListEvents {
    fn on_open(&mut self, entry: &LibraryEntry);

    /// Called after a long press started selection mode.
    fn on_long_press(&mut self, _entry: &LibraryEntry) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    pub folder_id: String,
    pub title: String,
    pub subtitle: String,
    pub show_checkbox: bool,
    pub checked: bool,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    pub title: String,
    pub delete_enabled: bool,
    pub rename_enabled: bool,
}

/// Presentation state of the library screen: the sorted entries, their
/// selection, and the event routing for row gestures.
pub struct LibraryList {
    tracker: SelectionTracker,
    sort: SortOrder,
}

impl LibraryList {
    pub fn new(sort: SortOrder) -> Self {
        Self {
            tracker: SelectionTracker::new(),
            sort,
        }
    }

    pub fn set_selection_listener(&mut self, listener: Box<dyn SelectionListener>) {
        self.tracker.set_listener(listener);
    }

    /// Installs the result of a fresh scan, sorted by the current order.
    pub fn reload(&mut self, mut entries: Vec<LibraryEntry>) {
        crate::sort::sort_entries(&mut entries, self.sort);
        self.tracker.set_entries(entries);
    }

    pub fn set_sort(&mut self, order: SortOrder) {
        self.sort = order;
        self.tracker.sort(order);
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn len(&self) -> usize {
        self.tracker.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.entries().is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&LibraryEntry> {
        self.tracker.entries().get(index)
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.tracker
            .entries()
            .iter()
            .map(|e| self.row_for(e))
            .collect()
    }

    /// Plain tap: toggles while selecting, otherwise opens the entry.
    pub fn tap(&mut self, index: usize, events: &mut dyn ListEvents) {
        let Some(entry) = self.entry(index).cloned() else {
            return;
        };
        if self.tracker.is_selection_mode() {
            self.tracker.toggle(&entry.folder_id);
        } else {
            events.on_open(&entry);
        }
    }

    /// Long press: starts selection mode with the pressed entry selected, or
    /// toggles it when already selecting.
    pub fn long_press(&mut self, index: usize, events: &mut dyn ListEvents) {
        let Some(entry) = self.entry(index).cloned() else {
            return;
        };
        if self.tracker.is_selection_mode() {
            self.tracker.toggle(&entry.folder_id);
            return;
        }
        self.tracker.enter_selection_mode(true);
        self.tracker.toggle(&entry.folder_id);
        events.on_long_press(&entry);
    }

    pub fn checkbox_clicked(&mut self, index: usize) {
        if let Some(id) = self.entry(index).map(|e| e.folder_id.clone()) {
            self.tracker.toggle(&id);
        }
    }

    pub fn toolbar(&self) -> ToolbarState {
        let count = self.tracker.selected_count();
        ToolbarState {
            title: if count > 0 {
                format!("{count} selected")
            } else {
                "Library".to_string()
            },
            delete_enabled: count > 0,
            rename_enabled: count == 1,
        }
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn selection_mut(&mut self) -> &mut SelectionTracker {
        &mut self.tracker
    }

    fn row_for(&self, entry: &LibraryEntry) -> RowView {
        RowView {
            folder_id: entry.folder_id.clone(),
            title: entry.display_title().to_string(),
            subtitle: format_timestamp(entry.timestamp),
            show_checkbox: self.tracker.is_selection_mode(),
            checked: self.tracker.is_selected(&entry.folder_id),
            external: entry.is_external(),
        }
    }
}

/// Local date and time, `YYYY-MM-DD HH:MM`.
pub fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}
