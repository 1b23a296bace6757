//! Error types for multiput-core

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Stage of an upload run at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Determining the source file size
    Stat,
    /// Opening the source file for positioned reads
    Open,
    /// Creating the remote multipart session
    CreateSession,
    /// Reading or uploading one of the chunks
    UploadPart,
    /// Submitting the assembled part list
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Stat => "stat",
            Stage::Open => "open",
            Stage::CreateSession => "create-session",
            Stage::UploadPart => "upload-part",
            Stage::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Core error types for the multiput library
#[derive(Error, Debug)]
pub enum Error {
    /// Local filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store reported a failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Chunk count or parallelism cannot produce a valid plan
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Neither a completed object nor an active session exists for the key
    #[error("upload {key} not found")]
    NotFound { key: String },

    /// An upload run failed at the given stage
    #[error("Upload failed during {stage}: {source}")]
    Upload {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker task panicked or was torn down by the runtime
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Wrap this error with the upload stage it happened in
    pub fn at(self, stage: Stage) -> Self {
        Error::Upload {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any stage wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Upload { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
