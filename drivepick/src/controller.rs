use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drivepick_core::{
    FilterConfig, FilterQuery, FolderRecord, Gateway, GatewayError, KnowledgeBaseService, Listing,
};
use tokio::sync::{mpsc, watch};

use crate::config::PickerConfig;
use crate::debounce::{Debouncer, RequestGenerations, Ticket};
use crate::notice::{Notice, Notifier};
use crate::session::Authenticator;
use crate::store::{PickerStore, ROOT_FOLDER_ID, SortKey, StoreError, ViewMode};
use crate::view::PickerView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAuthenticated,
    /// Folder loads are suspended while a search or filter view is active.
    Searching,
    EmptyInput,
    /// A newer search, filter or navigation started during the debounce window.
    Superseded,
}

/// What an operation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Skipped(SkipReason),
    /// The response arrived after the state it was requested for changed.
    Stale,
    Failed,
}

/// Orchestrates gateway calls and store transitions.
///
/// Cloning yields another handle to the same state, so operations can be
/// spawned as independent tasks. The store lock is never held across an
/// await; each transition happens in one critical section and republishes
/// the derived view before the lock is released.
///
/// Bulk and single-file index operations are not serialized against each
/// other. Callers are expected to disable their triggers while
/// [`PickerView::is_loading`] is set.
#[derive(Clone)]
pub struct Controller {
    store: Arc<Mutex<PickerStore>>,
    gateway: Arc<dyn Gateway>,
    knowledge_bases: Arc<dyn KnowledgeBaseService>,
    auth: Arc<dyn Authenticator>,
    notifier: Notifier,
    view_tx: Arc<watch::Sender<PickerView>>,
    generations: Arc<RequestGenerations>,
    listings: Arc<RequestGenerations>,
    debouncer: Debouncer,
    root_alias: Arc<str>,
}

struct LoadingGuard<'a> {
    controller: &'a Controller,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.controller.with_store(PickerStore::finish_loading);
    }
}

impl Controller {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        knowledge_bases: Arc<dyn KnowledgeBaseService>,
        auth: Arc<dyn Authenticator>,
        config: &PickerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let store = PickerStore::new(config.root_name.clone());
        let (view_tx, _) = watch::channel(PickerView::derive(&store));
        let (notifier, notices) = Notifier::channel();
        let controller = Self {
            store: Arc::new(Mutex::new(store)),
            gateway,
            knowledge_bases,
            auth,
            notifier,
            view_tx: Arc::new(view_tx),
            generations: Arc::new(RequestGenerations::new()),
            listings: Arc::new(RequestGenerations::new()),
            debouncer: Debouncer::new(config.search_debounce()),
            root_alias: Arc::from(config.root_alias.as_str()),
        };
        (controller, notices)
    }

    pub fn view(&self) -> PickerView {
        PickerView::derive(&self.lock_store())
    }

    pub fn subscribe(&self) -> watch::Receiver<PickerView> {
        self.view_tx.subscribe()
    }

    fn lock_store(&self) -> MutexGuard<'_, PickerStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, inspect: impl FnOnce(&PickerStore) -> R) -> R {
        inspect(&self.lock_store())
    }

    fn with_store<R>(&self, apply: impl FnOnce(&mut PickerStore) -> R) -> R {
        let mut store = self.lock_store();
        let result = apply(&mut store);
        self.view_tx.send_replace(PickerView::derive(&store));
        result
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.with_store(PickerStore::begin_loading);
        LoadingGuard { controller: self }
    }

    fn remote_folder_id<'a>(&'a self, folder_id: &'a str) -> &'a str {
        if folder_id == ROOT_FOLDER_ID {
            &self.root_alias
        } else {
            folder_id
        }
    }

    fn signed_in(&self, operation: &str) -> bool {
        let signed_in = self.auth.is_authenticated();
        if !signed_in {
            tracing::debug!("{operation} skipped: not signed in");
        }
        signed_in
    }

    fn report(&self, title: &str, err: &GatewayError) -> SyncOutcome {
        tracing::warn!("{title}: {err}");
        self.notifier.send(Notice::failure(title, err));
        SyncOutcome::Failed
    }

    /// Fetches the listing of the current folder. Only the latest load may
    /// apply its response, and only while its folder is still current.
    pub async fn load_current_folder(&self) -> SyncOutcome {
        if !self.signed_in("folder load") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        let (folder_id, mode) = self.read(|s| (s.current_folder().to_string(), s.mode()));
        if mode == ViewMode::Searching {
            return SyncOutcome::Skipped(SkipReason::Searching);
        }

        let ticket = self.listings.advance();
        let _loading = self.begin_loading();
        let result = self.gateway.list(self.remote_folder_id(&folder_id)).await;

        let applied = self.with_store(|store| {
            if !self.listings.is_current(ticket)
                || store.current_folder() != folder_id
                || !self.auth.is_authenticated()
            {
                return false;
            }
            store.set_listing(match &result {
                Ok(listing) => listing.clone(),
                Err(_) => Listing::default(),
            });
            true
        });
        match result {
            Ok(_) if applied => SyncOutcome::Applied,
            Err(err) if applied => self.report("Failed to load files", &err),
            Err(err) => {
                tracing::debug!("dropping failed listing of {folder_id}: {err}");
                SyncOutcome::Stale
            }
            Ok(_) => {
                tracing::debug!("dropping stale listing of {folder_id}");
                SyncOutcome::Stale
            }
        }
    }

    pub async fn refresh(&self) -> SyncOutcome {
        self.load_current_folder().await
    }

    pub async fn navigate_into(&self, folder: &FolderRecord) -> SyncOutcome {
        self.generations.advance();
        self.with_store(|store| store.navigate_into(folder));
        self.load_current_folder().await
    }

    pub async fn navigate_to_breadcrumb(
        &self,
        folder_id: &str,
        index: usize,
    ) -> Result<SyncOutcome, StoreError> {
        self.with_store(|store| store.navigate_to_breadcrumb(folder_id, index))?;
        self.generations.advance();
        Ok(self.load_current_folder().await)
    }

    /// Records the typed text and, once the debounce window passes without
    /// further input, searches for it. Blank text leaves the search view
    /// immediately.
    pub async fn on_search_query_change(&self, query: &str) -> SyncOutcome {
        let ticket = self.generations.advance();
        self.with_store(|store| store.set_search_query(query));

        let query = query.trim();
        if query.is_empty() {
            self.with_store(PickerStore::exit_search);
            return SyncOutcome::Applied;
        }
        if !self.signed_in("search") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        if !self.debouncer.quiesce(&self.generations, ticket).await {
            return SyncOutcome::Skipped(SkipReason::Superseded);
        }

        let _loading = self.begin_loading();
        let result = self.gateway.search(query).await;
        let files = match &result {
            Ok(files) => files.clone(),
            Err(_) => Vec::new(),
        };
        if !self.apply_if_current(ticket, |store| store.apply_search_results(query, files)) {
            tracing::debug!("dropping stale search results for {query:?}");
            return SyncOutcome::Stale;
        }
        match result {
            Ok(_) => SyncOutcome::Applied,
            Err(err) => self.report("Search failed", &err),
        }
    }

    /// Runs a filter over the current folder combined with the typed text.
    /// An empty text with an inactive filter returns to the folder listing
    /// without a remote call.
    pub async fn on_filter_change(&self, filter: FilterConfig) -> SyncOutcome {
        let ticket = self.generations.advance();
        let (folder_id, query) =
            self.read(|s| (s.current_folder().to_string(), s.search_query().trim().to_string()));

        if query.is_empty() && !filter.is_active() {
            self.with_store(PickerStore::exit_search);
            return SyncOutcome::Applied;
        }
        if !self.signed_in("filter") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }

        let _loading = self.begin_loading();
        let request = FilterQuery::new(&query, &filter);
        match self
            .gateway
            .filter(self.remote_folder_id(&folder_id), &request)
            .await
        {
            Ok(files) => {
                let applied = self.apply_if_current(ticket, |store| {
                    store.apply_filter_results(&query, filter, files)
                });
                if applied {
                    SyncOutcome::Applied
                } else {
                    tracing::debug!("dropping stale filter results");
                    SyncOutcome::Stale
                }
            }
            Err(err) => self.report("Filter failed", &err),
        }
    }

    fn apply_if_current(&self, ticket: Ticket, apply: impl FnOnce(&mut PickerStore)) -> bool {
        self.with_store(|store| {
            let current = self.generations.is_current(ticket);
            if current {
                apply(store);
            }
            current
        })
    }

    pub fn on_sort_change(&self, key: SortKey) -> SyncOutcome {
        self.with_store(|store| store.toggle_sort(key));
        SyncOutcome::Applied
    }

    pub fn toggle_selection(&self, file_id: &str) -> bool {
        self.with_store(|store| store.toggle_selection(file_id))
    }

    pub fn select_all(&self, checked: bool) {
        self.with_store(|store| store.select_all(checked));
    }

    /// Reads the remote flag and writes its inverse. Not atomic on the
    /// remote side.
    pub async fn toggle_index(&self, file_id: &str) -> SyncOutcome {
        if !self.signed_in("index toggle") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        let result = match self.gateway.index_status(file_id).await {
            Ok(true) => self.gateway.remove_from_index(file_id).await.map(|ok| (ok, false)),
            Ok(false) => self.gateway.add_to_index(file_id).await.map(|ok| (ok, true)),
            Err(err) => Err(err),
        };
        match result {
            Ok((true, value)) => {
                self.with_store(|store| store.set_index_flag(file_id, value));
                self.notifier.send(Notice::success(
                    "Success",
                    "File index status updated successfully.",
                ));
                SyncOutcome::Applied
            }
            Ok((false, _)) => {
                tracing::warn!("index toggle for {file_id} rejected by the service");
                self.notifier
                    .send(Notice::error("Error", "Failed to update index status."));
                SyncOutcome::Failed
            }
            Err(err) => self.report("Failed to update index status", &err),
        }
    }

    /// Removes one file through the bulk endpoint. Selection is untouched.
    pub async fn remove_from_index(&self, file_id: &str) -> SyncOutcome {
        if !self.signed_in("index removal") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        match self.gateway.bulk_remove(&[file_id.to_string()]).await {
            Ok(result) if result.success => {
                self.with_store(|store| store.set_index_flags(&result.removed, false));
                self.notifier.send(Notice::success(
                    "Success",
                    "File removed from index successfully.",
                ));
                SyncOutcome::Applied
            }
            Ok(_) => self.rejected("Failed to remove file from index"),
            Err(err) => self.report("Failed to remove file from index", &err),
        }
    }

    /// Indexes `file_ids`. Only ids the service reports as indexed are
    /// flagged; the selection is consumed on success.
    pub async fn bulk_index(&self, file_ids: &[String]) -> SyncOutcome {
        if file_ids.is_empty() {
            return SyncOutcome::Skipped(SkipReason::EmptyInput);
        }
        if !self.signed_in("bulk index") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        let _loading = self.begin_loading();
        match self.gateway.bulk_add(file_ids).await {
            Ok(result) if result.success => {
                self.with_store(|store| {
                    store.set_index_flags(&result.indexed, true);
                    store.clear_selection();
                });
                self.notifier.send(Notice::success(
                    "Success",
                    format!("{} files indexed successfully.", result.indexed.len()),
                ));
                SyncOutcome::Applied
            }
            Ok(_) => self.rejected("Failed to index files"),
            Err(err) => self.report("Failed to index files", &err),
        }
    }

    /// Removes `file_ids` from the index. Only ids the service reports as
    /// removed are unflagged; the selection is cleared even on partial
    /// success.
    pub async fn bulk_remove(&self, file_ids: &[String]) -> SyncOutcome {
        if file_ids.is_empty() {
            return SyncOutcome::Skipped(SkipReason::EmptyInput);
        }
        if !self.signed_in("bulk removal") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        let _loading = self.begin_loading();
        match self.gateway.bulk_remove(file_ids).await {
            Ok(result) if result.success => {
                self.with_store(|store| {
                    store.set_index_flags(&result.removed, false);
                    store.clear_selection();
                });
                self.notifier.send(Notice::success(
                    "Success",
                    format!(
                        "{} files removed from index successfully.",
                        result.removed.len()
                    ),
                ));
                SyncOutcome::Applied
            }
            Ok(_) => self.rejected("Failed to remove files from index"),
            Err(err) => self.report("Failed to remove files from index", &err),
        }
    }

    pub async fn bulk_index_selected(&self) -> SyncOutcome {
        let file_ids = self.read(PickerStore::selection);
        self.bulk_index(&file_ids).await
    }

    pub async fn bulk_remove_selected(&self) -> SyncOutcome {
        let file_ids = self.read(PickerStore::selection);
        self.bulk_remove(&file_ids).await
    }

    /// Creates a knowledge base from the current selection and starts its
    /// sync. The selection is cleared once both calls succeed.
    pub async fn create_knowledge_base(&self, name: &str, description: &str) -> SyncOutcome {
        if !self.signed_in("knowledge base creation") {
            return SyncOutcome::Skipped(SkipReason::NotAuthenticated);
        }
        let resource_ids = self.read(PickerStore::selection);
        if resource_ids.is_empty() {
            self.notifier.send(Notice::error(
                "No files selected",
                "Select at least one file to create a knowledge base.",
            ));
            return SyncOutcome::Skipped(SkipReason::EmptyInput);
        }

        let _loading = self.begin_loading();
        let created = match self
            .knowledge_bases
            .create_knowledge_base(&resource_ids, name.trim(), description.trim())
            .await
        {
            Ok(created) => created,
            Err(err) => return self.report("Failed to create knowledge base", &err),
        };
        match self
            .knowledge_bases
            .sync_knowledge_base(&created.knowledge_base_id)
            .await
        {
            Ok(sync) if sync.success => {
                tracing::info!(
                    "knowledge base {} created from {} files",
                    created.knowledge_base_id,
                    resource_ids.len()
                );
                self.with_store(PickerStore::clear_selection);
                self.notifier.send(Notice::success(
                    "Knowledge base created",
                    format!("{} is syncing {} files.", created.name, resource_ids.len()),
                ));
                SyncOutcome::Applied
            }
            Ok(sync) => {
                tracing::warn!(
                    "sync of knowledge base {} rejected: {}",
                    created.knowledge_base_id,
                    sync.message
                );
                self.notifier
                    .send(Notice::error("Failed to sync knowledge base", sync.message));
                SyncOutcome::Failed
            }
            Err(err) => self.report("Failed to sync knowledge base", &err),
        }
    }

    /// Ends the session: in-flight results are discarded and the store
    /// returns to its initial state.
    pub fn sign_out(&self) -> SyncOutcome {
        self.auth.sign_out();
        self.generations.advance();
        self.with_store(PickerStore::reset_state);
        tracing::info!("signed out, picker state reset");
        SyncOutcome::Applied
    }

    fn rejected(&self, title: &str) -> SyncOutcome {
        tracing::warn!("{title}: service reported no success");
        self.notifier
            .send(Notice::error(title, "The service did not accept the request."));
        SyncOutcome::Failed
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
