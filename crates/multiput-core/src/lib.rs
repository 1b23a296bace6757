//! multiput - parallel multipart uploads for large local files
//!
//! This library splits a local file into chunks, uploads them concurrently as
//! parts of a single multipart session, and assembles the parts into one
//! object. A separate read-only query reports whether an upload is finished,
//! still in progress, or absent, using nothing but the object key namespace.

pub mod assemble;
pub mod config;
pub mod error;
pub mod plan;
pub mod progress;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod upload;
pub mod worker;

pub use error::{Error, Result, Stage};

// Re-export commonly used types
pub use plan::{ChunkPlan, StrideAssignment};
pub use reconcile::{query_status, StatusQuery, UploadStatus};
pub use store::{
    CompletedObject, CompletedPart, MultipartStore, ObjectInfo, StoreError, UploadSession,
};
pub use upload::{upload, upload_with_progress, UploadOptions, UploadReport};
