//! In-memory multipart store
//!
//! Behaves like an S3 bucket for the operations multiput uses: part payloads
//! are kept per session, ETags are content digests, and completion checks the
//! submitted part list before concatenating it into an object.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use multiput_core::{
    CompletedObject, CompletedPart, MultipartStore, ObjectInfo, StoreError, UploadSession,
};
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug)]
struct Session {
    bucket: String,
    key: String,
    parts: BTreeMap<u32, Bytes>,
}

#[derive(Debug, Default)]
struct State {
    next_session: u64,
    sessions: HashMap<String, Session>,
    objects: HashMap<(String, String), Bytes>,
    completions: Vec<Vec<u32>>,
    part_attempts: Vec<u32>,
}

#[derive(Debug, Default)]
struct Faults {
    create: Option<StoreError>,
    parts: HashSet<u32>,
    complete: Option<StoreError>,
    head: Option<StoreError>,
    list: Option<StoreError>,
    max_part_delay_ms: u64,
}

/// Bucket contents and multipart sessions held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    faults: Mutex<Faults>,
    head_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

/// ETag of a payload, quoted the way S3 returns it
pub fn etag_of(payload: &[u8]) -> String {
    format!("\"{}\"", blake3::hash(payload).to_hex())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished object directly
    pub fn put_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.state()
            .objects
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    /// Open a session outside of any upload run, returning its id
    pub fn open_session(&self, bucket: &str, key: &str) -> String {
        let mut state = self.state();
        Self::insert_session(&mut state, bucket, key)
    }

    /// Contents of a finished object
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Sessions that were created and never completed
    pub fn active_sessions(&self) -> Vec<UploadSession> {
        let state = self.state();
        let mut sessions: Vec<UploadSession> = state
            .sessions
            .iter()
            .map(|(id, session)| UploadSession {
                bucket: session.bucket.clone(),
                key: session.key.clone(),
                session_id: id.clone(),
            })
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        sessions
    }

    /// Payloads currently stored for an open session, by part number
    pub fn session_parts(&self, session_id: &str) -> Option<BTreeMap<u32, Bytes>> {
        self.state()
            .sessions
            .get(session_id)
            .map(|session| session.parts.clone())
    }

    /// Part numbers of every completion request, in the order submitted
    pub fn completions(&self) -> Vec<Vec<u32>> {
        self.state().completions.clone()
    }

    /// Part numbers of every upload attempt, successful or not, in arrival order
    pub fn part_attempts(&self) -> Vec<u32> {
        self.state().part_attempts.clone()
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make session creation fail
    pub fn fail_create(&self, error: StoreError) {
        self.faults().create = Some(error);
    }

    /// Make every upload of `part_number` fail
    pub fn fail_part(&self, part_number: u32) {
        self.faults().parts.insert(part_number);
    }

    /// Make completion fail
    pub fn fail_complete(&self, error: StoreError) {
        self.faults().complete = Some(error);
    }

    /// Make head probes fail with `error`
    pub fn fail_head(&self, error: StoreError) {
        self.faults().head = Some(error);
    }

    /// Make session listings fail with `error`
    pub fn fail_list(&self, error: StoreError) {
        self.faults().list = Some(error);
    }

    /// Delay every part upload by a random duration up to `max`
    ///
    /// Shuffles the order in which concurrent workers finish.
    pub fn with_jitter(self, max: Duration) -> Self {
        self.faults().max_part_delay_ms = max.as_millis() as u64;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_session(state: &mut State, bucket: &str, key: &str) -> String {
        state.next_session += 1;
        let id = format!("session-{:04}", state.next_session);
        state.sessions.insert(
            id.clone(),
            Session {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        id
    }
}

#[async_trait]
impl MultipartStore for MemoryStore {
    async fn create_session(&self, bucket: &str, key: &str) -> Result<UploadSession, StoreError> {
        if let Some(error) = self.faults().create.clone() {
            return Err(error);
        }

        let session_id = self.open_session(bucket, key);
        Ok(UploadSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            session_id,
        })
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: u32,
        payload: Bytes,
    ) -> Result<CompletedPart, StoreError> {
        let (delay_ms, fails) = {
            let faults = self.faults();
            let delay = if faults.max_part_delay_ms > 0 {
                rand::thread_rng().gen_range(0..=faults.max_part_delay_ms)
            } else {
                0
            };
            (delay, faults.parts.contains(&part_number))
        };
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let mut state = self.state();
        state.part_attempts.push(part_number);
        if fails {
            return Err(StoreError::Service(format!(
                "injected failure for part {}",
                part_number
            )));
        }
        if part_number == 0 {
            return Err(StoreError::Rejected("part numbers start at 1".into()));
        }

        let stored = state
            .sessions
            .get_mut(&session.session_id)
            .ok_or_else(|| StoreError::NotFound(format!("upload {}", session.session_id)))?;
        let etag = etag_of(&payload);
        stored.parts.insert(part_number, payload);

        Ok(CompletedPart { part_number, etag })
    }

    async fn complete_session(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<CompletedObject, StoreError> {
        if let Some(error) = self.faults().complete.clone() {
            return Err(error);
        }

        let mut state = self.state();
        state
            .completions
            .push(parts.iter().map(|part| part.part_number).collect());

        let stored = state
            .sessions
            .get(&session.session_id)
            .ok_or_else(|| StoreError::NotFound(format!("upload {}", session.session_id)))?;

        if parts.is_empty() {
            return Err(StoreError::Rejected("at least one part is required".into()));
        }
        if parts
            .windows(2)
            .any(|pair| pair[0].part_number >= pair[1].part_number)
        {
            return Err(StoreError::Rejected(
                "parts must be in strictly ascending order".into(),
            ));
        }

        let mut object = BytesMut::new();
        for part in parts {
            let payload = stored.parts.get(&part.part_number).ok_or_else(|| {
                StoreError::Rejected(format!("part {} was never uploaded", part.part_number))
            })?;
            if etag_of(payload) != part.etag {
                return Err(StoreError::Rejected(format!(
                    "etag mismatch for part {}",
                    part.part_number
                )));
            }
            object.extend_from_slice(payload);
        }

        let object = object.freeze();
        let etag = etag_of(&object);
        state.sessions.remove(&session.session_id);
        state
            .objects
            .insert((session.bucket.clone(), session.key.clone()), object);

        Ok(CompletedObject {
            bucket: session.bucket.clone(),
            key: session.key.clone(),
            etag: Some(etag),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.faults().head.clone() {
            return Err(error);
        }

        let state = self.state();
        match state.objects.get(&(bucket.to_string(), key.to_string())) {
            Some(data) => Ok(ObjectInfo {
                key: key.to_string(),
                size: Some(data.len() as u64),
                etag: Some(etag_of(data)),
            }),
            None => Err(StoreError::NotFound(format!("{}/{}", bucket, key))),
        }
    }

    async fn list_sessions(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.faults().list.clone() {
            return Err(error);
        }

        let state = self.state();
        let mut keys: Vec<String> = state
            .sessions
            .values()
            .filter(|session| session.bucket == bucket && session.key.starts_with(prefix))
            .map(|session| session.key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_concatenates_parts() {
        let store = MemoryStore::new();
        let session = store.create_session("b", "k").await.unwrap();
        let p2 = store
            .upload_part(&session, 2, Bytes::from_static(b"world"))
            .await
            .unwrap();
        let p1 = store
            .upload_part(&session, 1, Bytes::from_static(b"hello "))
            .await
            .unwrap();

        let object = store.complete_session(&session, &[p1, p2]).await.unwrap();
        assert_eq!(object.key, "k");
        assert_eq!(store.object("b", "k").unwrap(), Bytes::from_static(b"hello world"));
        assert!(store.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_reupload_overwrites_part() {
        let store = MemoryStore::new();
        let session = store.create_session("b", "k").await.unwrap();
        store
            .upload_part(&session, 1, Bytes::from_static(b"old"))
            .await
            .unwrap();
        let part = store
            .upload_part(&session, 1, Bytes::from_static(b"new"))
            .await
            .unwrap();

        store.complete_session(&session, &[part]).await.unwrap();
        assert_eq!(store.object("b", "k").unwrap(), Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_unsorted_completion_rejected() {
        let store = MemoryStore::new();
        let session = store.create_session("b", "k").await.unwrap();
        let p1 = store
            .upload_part(&session, 1, Bytes::from_static(b"a"))
            .await
            .unwrap();
        let p2 = store
            .upload_part(&session, 2, Bytes::from_static(b"b"))
            .await
            .unwrap();

        let err = store.complete_session(&session, &[p2, p1]).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(store.active_sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_etag_rejected() {
        let store = MemoryStore::new();
        let session = store.create_session("b", "k").await.unwrap();
        let stale = store
            .upload_part(&session, 1, Bytes::from_static(b"first"))
            .await
            .unwrap();
        store
            .upload_part(&session, 1, Bytes::from_static(b"second"))
            .await
            .unwrap();

        let err = store.complete_session(&session, &[stale]).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_bucket_and_prefix() {
        let store = MemoryStore::new();
        store.open_session("b", "u/a/one");
        store.open_session("b", "u/other/two");
        store.open_session("c", "u/a/three");

        let keys = store.list_sessions("b", "u/a/").await.unwrap();
        assert_eq!(keys, vec!["u/a/one".to_string()]);
    }

    #[tokio::test]
    async fn test_head_reports_not_found() {
        let store = MemoryStore::new();
        let err = store.head_object("b", "missing").await.unwrap_err();
        assert!(err.is_not_found());

        store.put_object("b", "present", Bytes::from_static(b"xyz"));
        let info = store.head_object("b", "present").await.unwrap();
        assert_eq!(info.size, Some(3));
        assert_eq!(store.head_calls(), 2);
    }
}
