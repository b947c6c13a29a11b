use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drivepick_core::{
    BulkIndexed, BulkRemoved, FileRecord, FilterQuery, FolderRecord, Gateway, GatewayError,
    KnowledgeBase, KnowledgeBaseService, KnowledgeBaseSync, Listing, MemoryGateway,
};
use tokio::sync::mpsc;

use crate::config::PickerConfig;
use crate::controller::Controller;
use crate::notice::Notice;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Search(String),
    Filter(String, FilterQuery),
    IndexStatus(String),
    Add(String),
    Remove(String),
    BulkAdd(Vec<String>),
    BulkRemove(Vec<String>),
    CreateKnowledgeBase(Vec<String>),
    SyncKnowledgeBase(String),
}

/// Demo gateway with recorded calls, per-argument latency and injected
/// failures.
pub struct ScriptedGateway {
    inner: MemoryGateway,
    calls: Mutex<Vec<Call>>,
    delays: Mutex<HashMap<String, Duration>>,
    next_delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<&'static str>>,
    failing_next: Mutex<HashSet<&'static str>>,
    bulk_remove_only: Mutex<Option<Vec<String>>>,
}

impl ScriptedGateway {
    pub fn demo() -> Self {
        Self::new(MemoryGateway::demo())
    }

    pub fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            next_delays: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            failing_next: Mutex::new(HashSet::new()),
            bulk_remove_only: Mutex::new(None),
        }
    }

    /// Delays every call whose folder id, query or file id is `key`.
    pub fn delay(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
    }

    /// Delays only the next call keyed by `key`.
    pub fn delay_next(&self, key: &str, delay: Duration) {
        self.next_delays.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Fails only the next call of `operation`.
    pub fn fail_next(&self, operation: &'static str) {
        self.failing_next.lock().unwrap().insert(operation);
    }

    /// Makes bulk removal act on (and report) only `file_ids`.
    pub fn remove_only(&self, file_ids: &[&str]) {
        *self.bulk_remove_only.lock().unwrap() =
            Some(file_ids.iter().map(|id| id.to_string()).collect());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn file(&self, file_id: &str) -> FileRecord {
        self.inner.file(file_id).unwrap()
    }

    async fn enter(
        &self,
        operation: &'static str,
        key: &str,
        call: Call,
    ) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        let delay = self
            .next_delays
            .lock()
            .unwrap()
            .remove(key)
            .or_else(|| self.delays.lock().unwrap().get(key).copied());
        let fail = self.failing_next.lock().unwrap().remove(operation)
            || self.failing.lock().unwrap().contains(operation);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(GatewayError::Unavailable(format!("{operation} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn list(&self, folder_id: &str) -> Result<Listing, GatewayError> {
        self.enter("list", folder_id, Call::List(folder_id.into())).await?;
        self.inner.list(folder_id).await
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError> {
        self.enter("search", query, Call::Search(query.into())).await?;
        self.inner.search(query).await
    }

    async fn filter(
        &self,
        folder_id: &str,
        query: &FilterQuery,
    ) -> Result<Vec<FileRecord>, GatewayError> {
        self.enter("filter", folder_id, Call::Filter(folder_id.into(), query.clone()))
            .await?;
        self.inner.filter(folder_id, query).await
    }

    async fn index_status(&self, file_id: &str) -> Result<bool, GatewayError> {
        self.enter("index_status", file_id, Call::IndexStatus(file_id.into()))
            .await?;
        self.inner.index_status(file_id).await
    }

    async fn add_to_index(&self, file_id: &str) -> Result<bool, GatewayError> {
        self.enter("add", file_id, Call::Add(file_id.into())).await?;
        self.inner.add_to_index(file_id).await
    }

    async fn remove_from_index(&self, file_id: &str) -> Result<bool, GatewayError> {
        self.enter("remove", file_id, Call::Remove(file_id.into())).await?;
        self.inner.remove_from_index(file_id).await
    }

    async fn bulk_add(&self, file_ids: &[String]) -> Result<BulkIndexed, GatewayError> {
        self.enter("bulk_add", "", Call::BulkAdd(file_ids.to_vec())).await?;
        self.inner.bulk_add(file_ids).await
    }

    async fn bulk_remove(&self, file_ids: &[String]) -> Result<BulkRemoved, GatewayError> {
        self.enter("bulk_remove", "", Call::BulkRemove(file_ids.to_vec()))
            .await?;
        let only = self.bulk_remove_only.lock().unwrap().clone();
        match only {
            Some(subset) => {
                let subset: Vec<String> = file_ids
                    .iter()
                    .filter(|id| subset.contains(id))
                    .cloned()
                    .collect();
                self.inner.bulk_remove(&subset).await
            }
            None => self.inner.bulk_remove(file_ids).await,
        }
    }
}

#[async_trait]
impl KnowledgeBaseService for ScriptedGateway {
    async fn create_knowledge_base(
        &self,
        resource_ids: &[String],
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, GatewayError> {
        self.enter(
            "create_knowledge_base",
            name,
            Call::CreateKnowledgeBase(resource_ids.to_vec()),
        )
        .await?;
        self.inner
            .create_knowledge_base(resource_ids, name, description)
            .await
    }

    async fn sync_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSync, GatewayError> {
        self.enter(
            "sync_knowledge_base",
            knowledge_base_id,
            Call::SyncKnowledgeBase(knowledge_base_id.into()),
        )
        .await?;
        self.inner.sync_knowledge_base(knowledge_base_id).await
    }
}

pub struct Harness {
    pub controller: Controller,
    pub gateway: Arc<ScriptedGateway>,
    pub session: Arc<Session>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ScriptedGateway::demo(), Session::signed_in(), PickerConfig::default())
    }

    pub fn with(gateway: ScriptedGateway, session: Session, config: PickerConfig) -> Self {
        let gateway = Arc::new(gateway);
        let session = Arc::new(session);
        let (controller, notices) =
            Controller::new(gateway.clone(), gateway.clone(), session.clone(), &config);
        Self {
            controller,
            gateway,
            session,
            notices,
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }

    pub fn visible_ids(&self) -> Vec<String> {
        self.controller
            .view()
            .files
            .into_iter()
            .map(|f| f.id)
            .collect()
    }
}

pub fn folder(id: &str, name: &str) -> FolderRecord {
    FolderRecord {
        id: id.into(),
        name: name.into(),
        modified_time: time::OffsetDateTime::UNIX_EPOCH,
        parent_id: Some("root".into()),
    }
}
