//! Upload orchestrator
//!
//! Plans the chunks, opens the source file and the remote session, runs the
//! worker pool, and hands the collected parts to the assembler. Failures at
//! any stage are logged once here and returned to the caller. A session whose
//! run fails is left open on the store; nothing aborts it.

use crate::assemble::assemble;
use crate::error::Stage;
use crate::plan::{ChunkPlan, StrideAssignment};
use crate::progress::{NoProgress, ProgressAggregator, ProgressCallback};
use crate::source::SourceFile;
use crate::store::{CompletedObject, CompletedPart, MultipartStore, UploadSession};
use crate::worker::ChunkWorker;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Options for an upload run
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Number of concurrently running workers
    pub parallelism: u64,
    /// Object key within the bucket; a fresh UUID when unset
    pub file_key: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            parallelism: 1,
            file_key: None,
        }
    }
}

/// Summary of a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub bucket: String,
    pub key: String,
    pub session_id: String,
    /// Number of parts submitted to completion
    pub parts: usize,
    pub plan: ChunkPlan,
    pub object: CompletedObject,
}

/// Upload `source` to `bucket` in `chunk_count` chunks without progress output
pub async fn upload(
    store: Arc<dyn MultipartStore>,
    source: &Path,
    bucket: &str,
    chunk_count: u64,
    options: UploadOptions,
) -> Result<UploadReport> {
    upload_with_progress(
        store,
        source,
        bucket,
        chunk_count,
        options,
        Arc::new(NoProgress),
    )
    .await
}

/// Upload `source` to `bucket`, reporting phases and per-part progress to `progress`
pub async fn upload_with_progress(
    store: Arc<dyn MultipartStore>,
    source: &Path,
    bucket: &str,
    chunk_count: u64,
    options: UploadOptions,
    progress: Arc<dyn ProgressCallback>,
) -> Result<UploadReport> {
    let key = options
        .file_key
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    debug!(
        "uploading {} to {} using multipart upload with {} workers",
        source.display(),
        bucket,
        options.parallelism
    );

    let run = UploadRun {
        store,
        source: source.to_path_buf(),
        bucket: bucket.to_string(),
        key,
        chunk_count,
        parallelism: options.parallelism,
        progress,
    };

    match run.execute().await {
        Ok(report) => {
            debug!("{} uploaded to {}", report.key, report.bucket);
            Ok(report)
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}

struct UploadRun {
    store: Arc<dyn MultipartStore>,
    source: PathBuf,
    bucket: String,
    key: String,
    chunk_count: u64,
    parallelism: u64,
    progress: Arc<dyn ProgressCallback>,
}

impl UploadRun {
    async fn execute(self) -> Result<UploadReport> {
        StrideAssignment::new(0, self.parallelism)?;

        self.progress.begin_phase("Preparing");
        let prepared = self.prepare().await;
        self.progress.end_phase();
        let (plan, source, session) = prepared?;

        // Workers past the last part would only ever see an empty read
        let pool = self.parallelism.min(plan.expected_parts());
        let assignments = StrideAssignment::all(pool)?;

        let session = Arc::new(session);
        let part_lists = self
            .run_workers(assignments, plan, &source, &session)
            .await
            .map_err(|e| e.at(Stage::UploadPart))?;

        // Every worker has settled, so this is the last handle to the file
        drop(source);

        self.progress.begin_phase("Completing");
        let parts: usize = part_lists.iter().map(Vec::len).sum();
        let completed = assemble(self.store.as_ref(), &session, part_lists).await;
        self.progress.end_phase();
        let object = completed.map_err(|e| e.at(Stage::Complete))?;

        Ok(UploadReport {
            bucket: self.bucket,
            key: self.key,
            session_id: session.session_id.clone(),
            parts,
            plan,
            object,
        })
    }

    async fn prepare(&self) -> Result<(ChunkPlan, Arc<SourceFile>, UploadSession)> {
        debug!("determining file {} size", self.source.display());
        let size = tokio::fs::metadata(&self.source)
            .await
            .map_err(|e| Error::from(e).at(Stage::Stat))?
            .len();
        debug!("the file size is {} bytes", size);

        let plan = ChunkPlan::new(size, self.chunk_count)?;
        debug!("chunk size is {}", plan.chunk_size());
        if plan.remainder() > 0 {
            debug!(
                "{} trailing bytes beyond {} planned chunks go into a final short part",
                plan.remainder(),
                plan.chunk_count()
            );
        }

        let path = self.source.clone();
        let source = tokio::task::spawn_blocking(move || SourceFile::open(path))
            .await
            .map_err(|e| Error::from(e).at(Stage::Open))?
            .map_err(|e| Error::from(e).at(Stage::Open))?;

        debug!("creating multipart upload for {}", self.key);
        let session = self
            .store
            .create_session(&self.bucket, &self.key)
            .await
            .map_err(|e| Error::from(e).at(Stage::CreateSession))?;
        debug!("multipart upload {} created", session.session_id);

        Ok((plan, Arc::new(source), session))
    }

    /// Run one worker per assignment and collect their part lists
    ///
    /// Workers are never cancelled: after a failure the remaining workers run
    /// to their own end, their results are dropped, and the first failure in
    /// completion order is returned.
    async fn run_workers(
        &self,
        assignments: Vec<StrideAssignment>,
        plan: ChunkPlan,
        source: &Arc<SourceFile>,
        session: &Arc<UploadSession>,
    ) -> Result<Vec<Vec<CompletedPart>>> {
        debug!("spawning {} workers", assignments.len());
        let aggregator = ProgressAggregator::spawn(plan.expected_parts(), self.progress.clone());

        let mut workers = JoinSet::new();
        for assignment in assignments {
            let worker = ChunkWorker::new(
                assignment,
                plan,
                Arc::clone(source),
                Arc::clone(&self.store),
                Arc::clone(session),
            )
            .with_events(aggregator.sender());
            workers.spawn(worker.run());
        }

        let mut part_lists = Vec::new();
        let mut failure: Option<Error> = None;
        while let Some(joined) = workers.join_next().await {
            match joined.map_err(Error::from).and_then(|result| result) {
                Ok(parts) => part_lists.push(parts),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => warn!("additional worker failure discarded: {}", e),
            }
        }

        let uploaded = aggregator.finish().await;
        debug!("workers finished after {} uploaded parts", uploaded);

        match failure {
            Some(e) => Err(e),
            None => Ok(part_lists),
        }
    }
}
