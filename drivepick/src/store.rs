use std::collections::HashSet;

use drivepick_core::{FileRecord, FilterConfig, FolderRecord, Listing};
use serde::Serialize;
use thiserror::Error;

/// Folder id of the top of the navigation path.
pub const ROOT_FOLDER_ID: &str = "root";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("breadcrumb index {index} is outside a path of {len} entries")]
    BreadcrumbOutOfRange { index: usize, len: usize },
    #[error("breadcrumb {index} is folder {expected}, not {requested}")]
    BreadcrumbMismatch {
        index: usize,
        expected: String,
        requested: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Asc,
        }
    }
}

impl SortConfig {
    /// Same key flips the direction, a new key starts ascending.
    pub fn toggled(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Self { key, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Browsing,
    Searching,
}

/// Canonical picker state. Every method is one complete transition; callers
/// never observe a half-applied update.
#[derive(Debug, Clone)]
pub struct PickerStore {
    root: Breadcrumb,
    files: Vec<FileRecord>,
    folders: Vec<FolderRecord>,
    selected: HashSet<String>,
    current_folder: String,
    folder_path: Vec<Breadcrumb>,
    pending_loads: usize,
    search_query: String,
    applied_query: String,
    search_results: Vec<FileRecord>,
    sort: SortConfig,
    filter: FilterConfig,
}

impl PickerStore {
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = Breadcrumb {
            id: ROOT_FOLDER_ID.to_string(),
            name: root_name.into(),
        };
        Self {
            folder_path: vec![root.clone()],
            root,
            files: Vec::new(),
            folders: Vec::new(),
            selected: HashSet::new(),
            current_folder: ROOT_FOLDER_ID.to_string(),
            pending_loads: 0,
            search_query: String::new(),
            applied_query: String::new(),
            search_results: Vec::new(),
            sort: SortConfig::default(),
            filter: FilterConfig::default(),
        }
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn folders(&self) -> &[FolderRecord] {
        &self.folders
    }

    pub fn search_results(&self) -> &[FileRecord] {
        &self.search_results
    }

    pub fn current_folder(&self) -> &str {
        &self.current_folder
    }

    pub fn folder_path(&self) -> &[Breadcrumb] {
        &self.folder_path
    }

    pub fn is_loading(&self) -> bool {
        self.pending_loads > 0
    }

    /// Text typed by the user, possibly not searched yet.
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Query whose results are currently cached.
    pub fn applied_query(&self) -> &str {
        &self.applied_query
    }

    pub fn sort(&self) -> SortConfig {
        self.sort
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn mode(&self) -> ViewMode {
        if !self.applied_query.is_empty() || self.filter.is_active() {
            ViewMode::Searching
        } else {
            ViewMode::Browsing
        }
    }

    /// Files of the active view: search results while searching, the folder
    /// listing otherwise.
    pub fn view_files(&self) -> &[FileRecord] {
        match self.mode() {
            ViewMode::Searching => &self.search_results,
            ViewMode::Browsing => &self.files,
        }
    }

    pub fn is_selected(&self, file_id: &str) -> bool {
        self.selected.contains(file_id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Selected ids in the order the active view holds them.
    pub fn selection(&self) -> Vec<String> {
        self.view_files()
            .iter()
            .filter(|f| self.selected.contains(&f.id))
            .map(|f| f.id.clone())
            .collect()
    }

    pub fn set_listing(&mut self, listing: Listing) {
        self.files = listing.files;
        self.folders = listing.folders;
        self.retain_selection_in_view();
    }

    pub fn navigate_into(&mut self, folder: &FolderRecord) {
        self.current_folder = folder.id.clone();
        self.folder_path.push(Breadcrumb {
            id: folder.id.clone(),
            name: folder.name.clone(),
        });
        self.leave_view_context();
    }

    pub fn navigate_to_breadcrumb(
        &mut self,
        folder_id: &str,
        index: usize,
    ) -> Result<(), StoreError> {
        let len = self.folder_path.len();
        debug_assert!(index < len, "breadcrumb index {index} out of range ({len})");
        let Some(entry) = self.folder_path.get(index) else {
            return Err(StoreError::BreadcrumbOutOfRange { index, len });
        };
        if entry.id != folder_id {
            return Err(StoreError::BreadcrumbMismatch {
                index,
                expected: entry.id.clone(),
                requested: folder_id.to_string(),
            });
        }
        self.current_folder = folder_id.to_string();
        self.folder_path.truncate(index + 1);
        self.leave_view_context();
        Ok(())
    }

    /// Flips membership of `file_id`. Ids outside the active view are
    /// ignored. Returns whether the file is selected afterwards.
    pub fn toggle_selection(&mut self, file_id: &str) -> bool {
        if !self.view_files().iter().any(|f| f.id == file_id) {
            return false;
        }
        if !self.selected.remove(file_id) {
            self.selected.insert(file_id.to_string());
        }
        self.selected.contains(file_id)
    }

    pub fn select_all(&mut self, checked: bool) {
        self.selected = if checked {
            self.view_files().iter().map(|f| f.id.clone()).collect()
        } else {
            HashSet::new()
        };
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Updates one file in both the listing and the search cache. Selection
    /// is left alone.
    pub fn set_index_flag(&mut self, file_id: &str, value: bool) {
        for file in self.files.iter_mut().chain(self.search_results.iter_mut()) {
            if file.id == file_id {
                file.is_indexed = value;
            }
        }
    }

    /// Updates several files in both caches. Indexing consumes the selection.
    pub fn set_index_flags(&mut self, file_ids: &[String], value: bool) {
        let targets: HashSet<&str> = file_ids.iter().map(String::as_str).collect();
        for file in self.files.iter_mut().chain(self.search_results.iter_mut()) {
            if targets.contains(file.id.as_str()) {
                file.is_indexed = value;
            }
        }
        if value {
            self.selected.clear();
        }
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
    }

    pub fn apply_search_results(&mut self, query: &str, files: Vec<FileRecord>) {
        self.applied_query = query.trim().to_string();
        self.search_results = files;
        self.retain_selection_in_view();
    }

    pub fn apply_filter_results(
        &mut self,
        query: &str,
        filter: FilterConfig,
        files: Vec<FileRecord>,
    ) {
        self.applied_query = query.trim().to_string();
        self.filter = filter;
        self.search_results = files;
        self.retain_selection_in_view();
    }

    /// Returns to the folder listing. The typed text is kept.
    pub fn exit_search(&mut self) {
        self.applied_query.clear();
        self.filter = FilterConfig::default();
        self.search_results.clear();
        self.retain_selection_in_view();
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort = self.sort.toggled(key);
    }

    pub fn begin_loading(&mut self) {
        self.pending_loads += 1;
    }

    pub fn finish_loading(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
    }

    /// Back to the initial state. Loads still in flight keep counting until
    /// their guards release them.
    pub fn reset_state(&mut self) {
        let pending_loads = self.pending_loads;
        *self = Self::new(self.root.name.clone());
        self.pending_loads = pending_loads;
    }

    fn leave_view_context(&mut self) {
        self.search_query.clear();
        self.applied_query.clear();
        self.filter = FilterConfig::default();
        self.search_results.clear();
        self.selected.clear();
    }

    fn retain_selection_in_view(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        let view = match self.mode() {
            ViewMode::Searching => &self.search_results,
            ViewMode::Browsing => &self.files,
        };
        let visible: HashSet<&str> = view.iter().map(|f| f.id.as_str()).collect();
        self.selected.retain(|id| visible.contains(id.as_str()));
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
