//! Chunk worker: reads and uploads every chunk in one stride of indices

use crate::plan::{ChunkPlan, StrideAssignment};
use crate::progress::PartEvent;
use crate::source::SourceFile;
use crate::store::{CompletedPart, MultipartStore, UploadSession};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

/// One member of the upload pool
///
/// Holds shared, read-only references to the source file and the session.
pub struct ChunkWorker {
    assignment: StrideAssignment,
    plan: ChunkPlan,
    source: Arc<SourceFile>,
    store: Arc<dyn MultipartStore>,
    session: Arc<UploadSession>,
    events: Option<UnboundedSender<PartEvent>>,
}

impl ChunkWorker {
    pub fn new(
        assignment: StrideAssignment,
        plan: ChunkPlan,
        source: Arc<SourceFile>,
        store: Arc<dyn MultipartStore>,
        session: Arc<UploadSession>,
    ) -> Self {
        Self {
            assignment,
            plan,
            source,
            store,
            session,
            events: None,
        }
    }

    /// Report every uploaded part on `events`
    pub fn with_events(mut self, events: UnboundedSender<PartEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Upload this worker's chunks in index order until the file runs out
    ///
    /// Stops after a zero-length read, or after uploading a short read. The
    /// first read or upload failure is returned as is.
    pub async fn run(self) -> Result<Vec<CompletedPart>> {
        let chunk_size = self.plan.chunk_size();
        let len = usize::try_from(chunk_size)
            .map_err(|_| Error::InvalidPlan(format!("chunk size {} is too large", chunk_size)))?;
        let mut parts = Vec::new();

        for index in self.assignment.indices() {
            let offset = self.plan.offset(index);
            let payload = self.read_chunk(offset, len).await?;
            let bytes_read = payload.len();
            if bytes_read == 0 {
                trace!(
                    "worker {} reached end of file at chunk {}",
                    self.assignment.worker(),
                    index
                );
                break;
            }

            let part_number = part_number(index)?;
            debug!("uploading chunk {}: {} bytes", index, bytes_read);
            let part = self
                .store
                .upload_part(&self.session, part_number, payload)
                .await?;
            parts.push(part);

            if let Some(events) = &self.events {
                // The aggregator only goes away once the run is over
                let _ = events.send(PartEvent {
                    part_number,
                    bytes: bytes_read as u64,
                });
            }

            if bytes_read < len {
                break;
            }
        }

        Ok(parts)
    }

    async fn read_chunk(&self, offset: u64, len: usize) -> Result<bytes::Bytes> {
        let source = Arc::clone(&self.source);
        let payload = tokio::task::spawn_blocking(move || source.read_at(offset, len)).await??;
        Ok(payload)
    }
}

/// 1-based part number of an absolute chunk index
pub fn part_number(index: u64) -> Result<u32> {
    index
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::InvalidPlan(format!("chunk index {} exceeds part numbering", index)))
}
