use std::collections::HashSet;

use tracing::trace;

use crate::entry::LibraryEntry;
use crate::sort::{SortOrder, sort_entries};

/// Receives the selection count after every mutating operation.
pub trait SelectionListener {
    fn on_selection_changed(&mut self, count: usize);
}

/// Multi-selection state over the entries of one scan.
///
/// Selection is keyed by folder id. Selection mode is on while at least one
/// entry is selected; deselecting the last entry leaves selection mode.
/// `enter_selection_mode(true)` may hold the mode open with nothing selected
/// until the next toggle.
#[derive(Default)]
pub struct SelectionTracker {
    entries: Vec<LibraryEntry>,
    selected: HashSet<String>,
    selection_mode: bool,
    listener: Option<Box<dyn SelectionListener>>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&mut self, listener: Box<dyn SelectionListener>) {
        self.listener = Some(listener);
    }

    /// Replaces the backing list and drops any selection.
    pub fn set_entries(&mut self, entries: Vec<LibraryEntry>) {
        self.entries = entries;
        self.selected.clear();
        self.selection_mode = false;
        self.notify();
    }

    pub fn enter_selection_mode(&mut self, enter: bool) {
        self.selection_mode = enter;
        if !enter {
            self.selected.clear();
        }
        self.notify();
    }

    /// Flips membership of `folder_id`. Returns whether it is now selected.
    pub fn toggle(&mut self, folder_id: &str) -> bool {
        if !self.contains_entry(folder_id) {
            trace!(folder = folder_id, "toggle ignored for unknown entry");
            return false;
        }
        let now_selected = if self.selected.remove(folder_id) {
            false
        } else {
            self.selected.insert(folder_id.to_string());
            true
        };
        self.selection_mode = !self.selected.is_empty();
        self.notify();
        now_selected
    }

    pub fn select_by_id(&mut self, folder_id: &str, select: bool) {
        if !self.contains_entry(folder_id) {
            trace!(folder = folder_id, "select ignored for unknown entry");
            return;
        }
        if select {
            self.selected.insert(folder_id.to_string());
        } else {
            self.selected.remove(folder_id);
        }
        self.selection_mode = !self.selected.is_empty();
        self.notify();
    }

    pub fn select_all(&mut self) {
        self.selected = self.entries.iter().map(|e| e.folder_id.clone()).collect();
        self.selection_mode = !self.selected.is_empty();
        self.notify();
    }

    pub fn clear(&mut self) {
        self.enter_selection_mode(false);
    }

    /// Selected entries in list order.
    pub fn selected_entries(&self) -> Vec<LibraryEntry> {
        self.entries
            .iter()
            .filter(|e| self.selected.contains(&e.folder_id))
            .cloned()
            .collect()
    }

    /// Reorders the backing list; the selection is kept.
    pub fn sort(&mut self, order: SortOrder) {
        sort_entries(&mut self.entries, order);
    }

    pub fn is_selected(&self, folder_id: &str) -> bool {
        self.selected.contains(folder_id)
    }

    pub fn is_selection_mode(&self) -> bool {
        self.selection_mode
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    fn contains_entry(&self, folder_id: &str) -> bool {
        self.entries.iter().any(|e| e.folder_id == folder_id)
    }

    fn notify(&mut self) {
        let count = self.selected.len();
        if let Some(listener) = self.listener.as_mut() {
            listener.on_selection_changed(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<usize>>>);

    impl SelectionListener for Recorder {
        fn on_selection_changed(&mut self, count: usize) {
            self.0.borrow_mut().push(count);
        }
    }

    fn entries(ids: &[&str]) -> Vec<LibraryEntry> {
        ids.iter()
            .map(|id| LibraryEntry {
                folder_id: id.to_string(),
                title: String::new(),
                source_url: String::new(),
                timestamp: 0,
                content_path: format!("/lib/{id}/page.mht"),
            })
            .collect()
    }

    fn tracker_with(ids: &[&str]) -> (SelectionTracker, Rc<RefCell<Vec<usize>>>) {
        let counts = Rc::new(RefCell::new(Vec::new()));
        let mut tracker = SelectionTracker::new();
        tracker.set_listener(Box::new(Recorder(counts.clone())));
        tracker.set_entries(entries(ids));
        counts.borrow_mut().clear();
        (tracker, counts)
    }

    #[test]
    fn toggle_enters_and_leaves_selection_mode() {
        let (mut tracker, counts) = tracker_with(&["a", "b"]);
        assert!(tracker.toggle("a"));
        assert!(tracker.is_selection_mode());
        assert!(!tracker.toggle("a"));
        assert!(!tracker.is_selection_mode());
        assert_eq!(*counts.borrow(), vec![1, 0]);
    }

    #[test]
    fn select_all_then_clear() {
        let (mut tracker, counts) = tracker_with(&["a", "b", "c"]);
        tracker.select_all();
        assert_eq!(tracker.selected_count(), 3);
        tracker.clear();
        assert_eq!(tracker.selected_count(), 0);
        assert!(!tracker.is_selection_mode());
        assert_eq!(*counts.borrow(), vec![3, 0]);
    }

    #[test]
    fn select_all_on_empty_list_stays_out_of_selection_mode() {
        let (mut tracker, counts) = tracker_with(&[]);
        tracker.select_all();
        assert!(!tracker.is_selection_mode());
        assert_eq!(*counts.borrow(), vec![0]);
    }

    #[test]
    fn deselecting_every_entry_exits_selection_mode() {
        let (mut tracker, _) = tracker_with(&["a", "b"]);
        tracker.enter_selection_mode(true);
        tracker.select_by_id("a", true);
        tracker.select_by_id("b", true);
        tracker.select_by_id("a", false);
        assert!(tracker.is_selection_mode());
        tracker.select_by_id("b", false);
        assert_eq!(tracker.selected_count(), 0);
        assert!(!tracker.is_selection_mode());
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let (mut tracker, counts) = tracker_with(&["a"]);
        assert!(!tracker.toggle("zzz"));
        tracker.select_by_id("zzz", true);
        assert_eq!(tracker.selected_count(), 0);
        assert!(counts.borrow().is_empty());
    }

    #[test]
    fn selected_entries_follow_list_order() {
        let (mut tracker, _) = tracker_with(&["a", "b", "c"]);
        tracker.toggle("c");
        tracker.toggle("a");
        let ids: Vec<String> = tracker
            .selected_entries()
            .into_iter()
            .map(|e| e.folder_id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn reload_clears_selection() {
        let (mut tracker, counts) = tracker_with(&["a", "b"]);
        tracker.toggle("a");
        tracker.set_entries(entries(&["a", "b"]));
        assert!(!tracker.is_selected("a"));
        assert!(!tracker.is_selection_mode());
        assert_eq!(*counts.borrow(), vec![1, 0]);
    }

    #[test]
    fn explicit_mode_holds_without_selection() {
        let (mut tracker, _) = tracker_with(&["a"]);
        tracker.enter_selection_mode(true);
        assert!(tracker.is_selection_mode());
        assert_eq!(tracker.selected_count(), 0);
    }
}
