//! Remote object-store capability surface
//!
//! The upload engine and the status query only ever talk to a bucket through
//! [`MultipartStore`]. Backends live elsewhere: the S3 client in
//! `multiput-cloud`, an in-memory store in `multiput-testing`.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Failures reported by a store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested object or session does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The store answered, but refused the request or returned an unusable response
    #[error("rejected: {0}")]
    Rejected(String),

    /// Transport, authentication or any other service-side failure
    #[error("service error: {0}")]
    Service(String),
}

impl StoreError {
    /// Whether this is the "not found" outcome of a metadata probe
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// A multipart session opened for one object key
///
/// Created once per run and shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub bucket: String,
    pub key: String,
    pub session_id: String,
}

/// One uploaded part as acknowledged by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number, `chunk index + 1`
    pub part_number: u32,
    /// Opaque integrity token for the part payload
    pub etag: String,
}

/// Descriptor of an object produced by completing a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedObject {
    pub bucket: String,
    pub key: String,
    pub etag: Option<String>,
}

/// Metadata returned by a head probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: Option<u64>,
    pub etag: Option<String>,
}

/// Operations the engine needs from a remote bucket
#[async_trait]
pub trait MultipartStore: Send + Sync {
    /// Open a multipart session for `bucket/key`
    async fn create_session(&self, bucket: &str, key: &str) -> Result<UploadSession, StoreError>;

    /// Upload `payload` as part `part_number` of the session
    ///
    /// Uploading the same part number twice replaces the earlier bytes.
    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: u32,
        payload: Bytes,
    ) -> Result<CompletedPart, StoreError>;

    /// Assemble the session from `parts`, which must be sorted ascending by part number
    async fn complete_session(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<CompletedObject, StoreError>;

    /// Fetch object metadata, failing with [`StoreError::NotFound`] when absent
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError>;

    /// Keys of every active multipart session whose key starts with `prefix`
    async fn list_sessions(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;
}
