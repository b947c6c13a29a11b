use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::gateway::{Gateway, GatewayError, KnowledgeBaseService};
use crate::records::{
    BulkIndexed, BulkRemoved, FileRecord, FilterQuery, FolderRecord, KnowledgeBase,
    KnowledgeBaseSync, Listing,
};

/// In-process file store implementing the gateway contract.
///
/// Items whose `parent_id` equals the requested folder id are that folder's
/// children; root-level items carry the root alias as their parent.
pub struct MemoryGateway {
    files: Mutex<Vec<FileRecord>>,
    folders: Vec<FolderRecord>,
    next_knowledge_base: AtomicU64,
}

impl MemoryGateway {
    pub fn new(files: Vec<FileRecord>, folders: Vec<FolderRecord>) -> Self {
        Self {
            files: Mutex::new(files),
            folders,
            next_knowledge_base: AtomicU64::new(1),
        }
    }

    /// A small drive with two root folders and six documents.
    pub fn demo() -> Self {
        let files = vec![
            demo_file(
                "1",
                "Project Proposal.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                datetime!(2025-04-10 14:30 UTC),
                245 * 1024,
                true,
                "root",
            ),
            demo_file(
                "2",
                "Budget 2025.xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                datetime!(2025-04-08 09:15 UTC),
                128 * 1024,
                false,
                "root",
            ),
            demo_file(
                "3",
                "Meeting Notes.pdf",
                "application/pdf",
                datetime!(2025-04-12 16:45 UTC),
                1_258_291,
                true,
                "root",
            ),
            demo_file(
                "4",
                "Product Roadmap.pptx",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                datetime!(2025-04-05 11:20 UTC),
                3_670_016,
                false,
                "root",
            ),
            demo_file(
                "5",
                "Research Paper.pdf",
                "application/pdf",
                datetime!(2025-04-01 08:30 UTC),
                2_936_012,
                true,
                "docs",
            ),
            demo_file(
                "6",
                "Client Feedback.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                datetime!(2025-04-03 13:45 UTC),
                198 * 1024,
                false,
                "docs",
            ),
        ];
        let folders = vec![
            FolderRecord {
                id: "docs".into(),
                name: "Documents".into(),
                modified_time: datetime!(2025-04-02 09:30 UTC),
                parent_id: Some("root".into()),
            },
            FolderRecord {
                id: "images".into(),
                name: "Images".into(),
                modified_time: datetime!(2025-03-29 14:20 UTC),
                parent_id: Some("root".into()),
            },
        ];
        Self::new(files, folders)
    }

    pub fn file(&self, file_id: &str) -> Option<FileRecord> {
        self.files().iter().find(|f| f.id == file_id).cloned()
    }

    fn files(&self) -> MutexGuard<'_, Vec<FileRecord>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_flag(&self, file_id: &str, value: bool) -> bool {
        let mut files = self.files();
        match files.iter_mut().find(|f| f.id == file_id) {
            Some(file) => {
                file.is_indexed = value;
                true
            }
            None => false,
        }
    }

    fn set_flags(&self, file_ids: &[String], value: bool) -> Vec<String> {
        let mut files = self.files();
        file_ids
            .iter()
            .filter(|id| match files.iter_mut().find(|f| &f.id == *id) {
                Some(file) => {
                    file.is_indexed = value;
                    true
                }
                None => false,
            })
            .cloned()
            .collect()
    }
}

fn demo_file(
    id: &str,
    name: &str,
    mime_type: &str,
    modified_time: OffsetDateTime,
    size: u64,
    is_indexed: bool,
    parent_id: &str,
) -> FileRecord {
    FileRecord {
        id: id.into(),
        name: name.into(),
        mime_type: mime_type.into(),
        modified_time,
        size: Some(size),
        is_indexed,
        parent_id: Some(parent_id.into()),
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list(&self, folder_id: &str) -> Result<Listing, GatewayError> {
        let in_folder = |parent: &Option<String>| parent.as_deref() == Some(folder_id);
        let files = self
            .files()
            .iter()
            .filter(|f| in_folder(&f.parent_id))
            .cloned()
            .collect();
        let folders = self
            .folders
            .iter()
            .filter(|f| in_folder(&f.parent_id))
            .cloned()
            .collect();
        Ok(Listing { files, folders })
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError> {
        let needle = query.to_lowercase();
        Ok(self
            .files()
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn filter(
        &self,
        folder_id: &str,
        query: &FilterQuery,
    ) -> Result<Vec<FileRecord>, GatewayError> {
        Ok(self
            .files()
            .iter()
            .filter(|f| f.parent_id.as_deref() == Some(folder_id) && query.matches(f))
            .cloned()
            .collect())
    }

    async fn index_status(&self, file_id: &str) -> Result<bool, GatewayError> {
        Ok(self.file(file_id).is_some_and(|f| f.is_indexed))
    }

    async fn add_to_index(&self, file_id: &str) -> Result<bool, GatewayError> {
        Ok(self.set_flag(file_id, true))
    }

    async fn remove_from_index(&self, file_id: &str) -> Result<bool, GatewayError> {
        Ok(self.set_flag(file_id, false))
    }

    async fn bulk_add(&self, file_ids: &[String]) -> Result<BulkIndexed, GatewayError> {
        Ok(BulkIndexed {
            success: true,
            indexed: self.set_flags(file_ids, true),
        })
    }

    async fn bulk_remove(&self, file_ids: &[String]) -> Result<BulkRemoved, GatewayError> {
        Ok(BulkRemoved {
            success: true,
            removed: self.set_flags(file_ids, false),
        })
    }
}

#[async_trait]
impl KnowledgeBaseService for MemoryGateway {
    async fn create_knowledge_base(
        &self,
        resource_ids: &[String],
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, GatewayError> {
        if resource_ids.is_empty() {
            return Err(GatewayError::Unavailable(
                "knowledge base needs at least one resource".into(),
            ));
        }
        let seq = self.next_knowledge_base.fetch_add(1, Ordering::SeqCst);
        let now = OffsetDateTime::now_utc();
        Ok(KnowledgeBase {
            knowledge_base_id: format!("kb-{seq}"),
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn sync_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSync, GatewayError> {
        Ok(KnowledgeBaseSync {
            success: true,
            message: format!("sync started for {knowledge_base_id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{FilterConfig, MimeCategory};

    fn ids(files: &[FileRecord]) -> Vec<&str> {
        files.iter().map(|f| f.id.as_str()).collect()
    }

    #[tokio::test]
    async fn lists_children_of_requested_folder_only() {
        let gateway = MemoryGateway::demo();
        let root = gateway.list("root").await.unwrap();
        assert_eq!(ids(&root.files), vec!["1", "2", "3", "4"]);
        assert_eq!(root.folders.len(), 2);

        let docs = gateway.list("docs").await.unwrap();
        assert_eq!(ids(&docs.files), vec!["5", "6"]);
        assert!(docs.folders.is_empty());

        assert_eq!(gateway.list("images").await.unwrap(), Listing::default());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring_over_all_files() {
        let gateway = MemoryGateway::demo();
        let hits = gateway.search("PAPER").await.unwrap();
        assert_eq!(ids(&hits), vec!["5"]);
        let hits = gateway.search(".").await.unwrap();
        assert_eq!(hits.len(), 6);
    }

    #[tokio::test]
    async fn filter_is_scoped_to_folder_and_conjunctive() {
        let gateway = MemoryGateway::demo();
        let filter = FilterConfig::default().with_categories(&[MimeCategory::Pdf]);
        let hits = gateway
            .filter("root", &FilterQuery::new("", &filter))
            .await
            .unwrap();
        assert_eq!(ids(&hits), vec!["3"]);

        let hits = gateway
            .filter("root", &FilterQuery::new("budget", &filter))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn bulk_operations_report_only_known_ids() {
        let gateway = MemoryGateway::demo();
        let result = gateway
            .bulk_add(&["2".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.indexed, vec!["2".to_string()]);
        assert!(gateway.index_status("2").await.unwrap());

        let result = gateway.bulk_remove(&["2".to_string()]).await.unwrap();
        assert_eq!(result.removed, vec!["2".to_string()]);
        assert!(!gateway.index_status("2").await.unwrap());
    }

    #[tokio::test]
    async fn knowledge_bases_get_sequential_ids() {
        let gateway = MemoryGateway::demo();
        let first = gateway
            .create_knowledge_base(&["1".to_string()], "Q2", "planning")
            .await
            .unwrap();
        let second = gateway
            .create_knowledge_base(&["2".to_string()], "Q3", "")
            .await
            .unwrap();
        assert_eq!(first.knowledge_base_id, "kb-1");
        assert_eq!(second.knowledge_base_id, "kb-2");
        assert!(
            gateway
                .sync_knowledge_base(&first.knowledge_base_id)
                .await
                .unwrap()
                .success
        );
    }
}
