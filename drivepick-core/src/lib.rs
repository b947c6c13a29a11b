mod client;
mod gateway;
mod memory;
mod records;

pub use client::DriveClient;
pub use gateway::{ApiErrorClass, Gateway, GatewayError, KnowledgeBaseService};
pub use memory::MemoryGateway;
pub use records::{
    BulkIndexed, BulkRemoved, FileKind, FileRecord, FilterConfig, FilterQuery, FolderRecord,
    KnowledgeBase, KnowledgeBaseSync, Listing, MimeCategory, human_size,
};
