use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::gateway::{Gateway, GatewayError, KnowledgeBaseService};
use crate::records::{
    BulkIndexed, BulkRemoved, FileRecord, FilterQuery, FolderRecord, KnowledgeBase,
    KnowledgeBaseSync, Listing,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::CannotBeABase);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::CannotBeABase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", self.auth_header_value())
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Api { status, body })
        }
    }

    async fn fetch_files(
        &self,
        url: Url,
        operation: &str,
    ) -> Result<Vec<FileRecord>, GatewayError> {
        let response = self.authorized(self.http.get(url)).send().await?;
        let payload: FilesPayload = Self::handle_response(response).await?;
        match decode_rows(payload.files) {
            Ok(files) => Ok(files),
            Err(err) => {
                tracing::warn!(operation, "discarding response with undecodable row: {err}");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl Gateway for DriveClient {
    async fn list(&self, folder_id: &str) -> Result<Listing, GatewayError> {
        let url = self.endpoint(&["v1", "folders", folder_id, "children"])?;
        let response = self.authorized(self.http.get(url)).send().await?;
        let payload: ListingPayload = Self::handle_response(response).await?;
        let decoded = decode_rows::<FileRecord>(payload.files).and_then(|files| {
            decode_rows::<FolderRecord>(payload.folders).map(|folders| Listing { files, folders })
        });
        match decoded {
            Ok(listing) => Ok(listing),
            Err(err) => {
                tracing::warn!(folder_id, "discarding listing with undecodable row: {err}");
                Ok(Listing::default())
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>, GatewayError> {
        let mut url = self.endpoint(&["v1", "files", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        self.fetch_files(url, "search").await
    }

    async fn filter(
        &self,
        folder_id: &str,
        query: &FilterQuery,
    ) -> Result<Vec<FileRecord>, GatewayError> {
        let mut url = self.endpoint(&["v1", "folders", folder_id, "files"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(name) = &query.name {
                pairs.append_pair("name", name);
            }
            for mime_type in &query.mime_types {
                pairs.append_pair("mime_type", mime_type);
            }
            if let Some(from) = query.date_from {
                pairs.append_pair("modified_from", &format_timestamp(from));
            }
            if let Some(to) = query.date_to {
                pairs.append_pair("modified_to", &format_timestamp(to));
            }
        }
        self.fetch_files(url, "filter").await
    }

    async fn index_status(&self, file_id: &str) -> Result<bool, GatewayError> {
        let url = self.endpoint(&["v1", "index", file_id])?;
        let response = self.authorized(self.http.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let status: IndexStatus = Self::handle_response(response).await?;
        Ok(status.indexed)
    }

    async fn add_to_index(&self, file_id: &str) -> Result<bool, GatewayError> {
        let url = self.endpoint(&["v1", "index", file_id])?;
        let response = self.authorized(self.http.put(url)).send().await?;
        let ack: Ack = Self::handle_response(response).await?;
        Ok(ack.success)
    }

    async fn remove_from_index(&self, file_id: &str) -> Result<bool, GatewayError> {
        let url = self.endpoint(&["v1", "index", file_id])?;
        let response = self.authorized(self.http.delete(url)).send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(true);
        }
        let ack: Ack = Self::handle_response(response).await?;
        Ok(ack.success)
    }

    async fn bulk_add(&self, file_ids: &[String]) -> Result<BulkIndexed, GatewayError> {
        let url = self.endpoint(&["v1", "index", "bulk-add"])?;
        let response = self
            .authorized(self.http.post(url))
            .json(&BulkRequest { file_ids })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn bulk_remove(&self, file_ids: &[String]) -> Result<BulkRemoved, GatewayError> {
        let url = self.endpoint(&["v1", "index", "bulk-remove"])?;
        let response = self
            .authorized(self.http.post(url))
            .json(&BulkRequest { file_ids })
            .send()
            .await?;
        Self::handle_response(response).await
    }
}

#[async_trait]
impl KnowledgeBaseService for DriveClient {
    async fn create_knowledge_base(
        &self,
        resource_ids: &[String],
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, GatewayError> {
        let url = self.endpoint(&["v1", "knowledge-bases"])?;
        let response = self
            .authorized(self.http.post(url))
            .json(&CreateKnowledgeBase {
                resource_ids,
                name,
                description,
            })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn sync_knowledge_base(
        &self,
        knowledge_base_id: &str,
    ) -> Result<KnowledgeBaseSync, GatewayError> {
        let url = self.endpoint(&["v1", "knowledge-bases", knowledge_base_id, "sync"])?;
        let response = self.authorized(self.http.post(url)).send().await?;
        Self::handle_response(response).await
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, serde_json::Error> {
    rows.into_iter().map(serde_json::from_value).collect()
}

fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

#[derive(Debug, Deserialize)]
struct ListingPayload {
    #[serde(default)]
    files: Vec<Value>,
    #[serde(default)]
    folders: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FilesPayload {
    #[serde(default)]
    files: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    indexed: bool,
}

#[derive(Debug, Deserialize)]
struct Ack {
    success: bool,
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    file_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct CreateKnowledgeBase<'a> {
    resource_ids: &'a [String],
    name: &'a str,
    description: &'a str,
}
