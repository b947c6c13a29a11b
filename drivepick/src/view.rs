use std::cmp::Ordering;

use drivepick_core::{FileKind, FileRecord, FilterConfig, FolderRecord, human_size};
use icu_collator::{Collator, CollatorOptions};
use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::store::{Breadcrumb, PickerStore, SortConfig, SortDirection, SortKey, ViewMode};

/// Items ordered by the picker's sort rule.
pub trait Sortable {
    fn sort_name(&self) -> &str;
    fn sort_time(&self) -> OffsetDateTime;
}

impl Sortable for FileRecord {
    fn sort_name(&self) -> &str {
        &self.name
    }

    fn sort_time(&self) -> OffsetDateTime {
        self.modified_time
    }
}

impl Sortable for FolderRecord {
    fn sort_name(&self) -> &str {
        &self.name
    }

    fn sort_time(&self) -> OffsetDateTime {
        self.modified_time
    }
}

thread_local! {
    static COLLATOR: Option<Collator> =
        Collator::try_new(&Default::default(), CollatorOptions::new())
            .map_err(|err| tracing::warn!("name collation unavailable: {err}"))
            .ok();
}

/// Root-locale collation: accents and case are secondary to the base
/// letters, lowercase first. Raw text breaks remaining ties.
fn compare_names(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        })
        .then_with(|| a.cmp(b))
}

fn compare<T: Sortable>(a: &T, b: &T, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => compare_names(a.sort_name(), b.sort_name()),
        SortKey::Date => a.sort_time().cmp(&b.sort_time()),
    }
}

/// Stable sort. Equal items keep their input order in both directions.
pub fn sort_items<T: Sortable + Clone>(items: &[T], sort: SortConfig) -> Vec<T> {
    let mut sorted = items.to_vec();
    match sort.direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare(a, b, sort.key)),
        SortDirection::Desc => sorted.sort_by(|a, b| compare(b, a, sort.key)),
    }
    sorted
}

/// Read-only projection of the store handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerView {
    pub mode: ViewMode,
    pub folders: Vec<FolderRecord>,
    #[serde(serialize_with = "serialize_file_rows")]
    pub files: Vec<FileRecord>,
    pub selected: Vec<String>,
    pub all_selected: bool,
    pub selected_count: usize,
    /// Indexed files in the folder listing, whatever the mode.
    pub indexed_count: usize,
    pub is_loading: bool,
    pub search_query: String,
    pub sort: SortConfig,
    pub filter: FilterConfig,
    pub folder_path: Vec<Breadcrumb>,
    pub current_folder: String,
}

impl PickerView {
    pub fn derive(store: &PickerStore) -> Self {
        let mode = store.mode();
        let sort = store.sort();
        let files = sort_items(store.view_files(), sort);
        let folders = match mode {
            ViewMode::Browsing => sort_items(store.folders(), sort),
            ViewMode::Searching => Vec::new(),
        };
        let selected: Vec<String> = files
            .iter()
            .filter(|f| store.is_selected(&f.id))
            .map(|f| f.id.clone())
            .collect();
        Self {
            mode,
            all_selected: !files.is_empty() && selected.len() == files.len(),
            selected_count: selected.len(),
            indexed_count: store.files().iter().filter(|f| f.is_indexed).count(),
            selected,
            folders,
            files,
            is_loading: store.is_loading(),
            search_query: store.search_query().to_string(),
            sort,
            filter: store.filter().clone(),
            folder_path: store.folder_path().to_vec(),
            current_folder: store.current_folder().to_string(),
        }
    }
}

/// A file as rendered in a row, with its icon kind and size label.
#[derive(Serialize)]
struct FileRow<'a> {
    #[serde(flatten)]
    file: &'a FileRecord,
    kind: FileKind,
    size_label: String,
}

fn serialize_file_rows<S>(files: &[FileRecord], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(files.iter().map(|file| FileRow {
        file,
        kind: file.kind(),
        size_label: human_size(file.size),
    }))
}
