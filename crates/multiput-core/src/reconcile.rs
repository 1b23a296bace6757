//! Upload status derived from the object key namespace
//!
//! Uploads addressed as `{user}/{app}/{file_key}` can be checked without the
//! session id: a finished object answers the head probe, an unfinished one is
//! still listed among the bucket's active multipart sessions.

use crate::store::MultipartStore;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Observable state of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// The object is fully materialized
    Ready,
    /// A multipart session for the key is still open
    Creating,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Ready => f.write_str("ready"),
            UploadStatus::Creating => f.write_str("creating"),
        }
    }
}

/// Key coordinates of a status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    pub bucket: String,
    pub user_id: String,
    pub app_id: String,
    pub file_key: String,
}

impl StatusQuery {
    pub fn new(
        bucket: impl Into<String>,
        user_id: impl Into<String>,
        app_id: impl Into<String>,
        file_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            user_id: user_id.into(),
            app_id: app_id.into(),
            file_key: file_key.into(),
        }
    }

    /// `{user}/{app}/`
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.user_id, self.app_id)
    }

    /// `{user}/{app}/{file_key}`
    pub fn key(&self) -> String {
        format!("{}{}", self.prefix(), self.file_key)
    }
}

/// Resolve the status of the upload named by `query`
///
/// A completed object wins over any session still open for the same key. Only
/// a "not found" head probe falls through to the session listing; any other
/// store failure is returned unchanged.
pub async fn query_status(store: &dyn MultipartStore, query: &StatusQuery) -> Result<UploadStatus> {
    let prefix = query.prefix();
    let key = query.key();

    debug!("probing object {} directly", key);
    match store.head_object(&query.bucket, &key).await {
        Ok(_) => return Ok(UploadStatus::Ready),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    debug!("listing active multipart uploads under {}", prefix);
    let active = store.list_sessions(&query.bucket, &prefix).await?;
    let creating = active
        .iter()
        .filter_map(|session_key| session_key.strip_prefix(prefix.as_str()))
        .any(|suffix| suffix == query.file_key);

    if creating {
        Ok(UploadStatus::Creating)
    } else {
        Err(Error::NotFound {
            key: query.file_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let query = StatusQuery::new("b", "u", "a", "f");
        assert_eq!(query.prefix(), "u/a/");
        assert_eq!(query.key(), "u/a/f");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(UploadStatus::Ready.to_string(), "ready");
        assert_eq!(UploadStatus::Creating.to_string(), "creating");
    }
}
