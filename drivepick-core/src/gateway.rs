use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::records::{
    BulkIndexed, BulkRemoved, FileRecord, FilterQuery, KnowledgeBase, KnowledgeBaseSync, Listing,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments")]
    CannotBeABase,
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("file store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

impl GatewayError {
    pub fn classification(&self) -> ApiErrorClass {
        match self {
            GatewayError::Api { status, .. } => classify_api_status(*status),
            GatewayError::Request(_) | GatewayError::Unavailable(_) => ApiErrorClass::Transient,
            GatewayError::Url(_) | GatewayError::CannotBeABase => ApiErrorClass::Permanent,
        }
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

/// Remote listing, search and per-file index flag operations.
///
/// Every call is independent; implementations keep no per-caller state.
/// `list` must yield an empty listing rather than partially decoded data.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list(&self, folder_id: &str) -> Result<Listing, GatewayError>;

    /// Files only. Matching is at least a substring match on the name.
    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError>;

    async fn filter(
        &self,
        folder_id: &str,
        query: &FilterQuery,
    ) -> Result<Vec<FileRecord>, GatewayError>;

    async fn index_status(&self, file_id: &str) -> Result<bool, GatewayError>;

    async fn add_to_index(&self, file_id: &str) -> Result<bool, GatewayError>;

    async fn remove_from_index(&self, file_id: &str) -> Result<bool, GatewayError>;

    /// Reports the subset of `file_ids` that was actually indexed.
    async fn bulk_add(&self, file_ids: &[String]) -> Result<BulkIndexed, GatewayError>;

    /// Reports the subset of `file_ids` that was actually removed.
    async fn bulk_remove(&self, file_ids: &[String]) -> Result<BulkRemoved, GatewayError>;
}

#[async_trait]
pub trait KnowledgeBaseService: Send + Sync {
    async fn create_knowledge_base(
        &self,
        resource_ids: &[String],
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, GatewayError>;

    async fn sync_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSync, GatewayError>;
}
