//! Chunk sizing and stride assignment of chunk indices to workers

use crate::{Error, Result};

/// Chunk layout derived once per run from the file size and requested chunk count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    size: u64,
    chunk_count: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Plan `chunk_count` chunks of `floor(size / chunk_count)` bytes
    ///
    /// Fails when the chunk size would be zero, i.e. `chunk_count` is zero or
    /// larger than the file.
    pub fn new(size: u64, chunk_count: u64) -> Result<Self> {
        if chunk_count == 0 {
            return Err(Error::InvalidPlan("chunk count must be at least 1".into()));
        }
        if chunk_count > size {
            return Err(Error::InvalidPlan(format!(
                "cannot split {} bytes into {} chunks",
                size, chunk_count
            )));
        }

        Ok(Self {
            size,
            chunk_count,
            chunk_size: size / chunk_count,
        })
    }

    /// Total size of the source file
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Requested number of chunks
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Bytes per chunk
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Byte offset of an absolute chunk index
    pub fn offset(&self, index: u64) -> u64 {
        index * self.chunk_size
    }

    /// Number of parts a full pass over the file produces, `ceil(size / chunk_size)`
    pub fn expected_parts(&self) -> u64 {
        self.size.div_ceil(self.chunk_size)
    }

    /// Bytes covered by the `chunk_count` full-size chunks
    pub fn planned_coverage(&self) -> u64 {
        self.chunk_size * self.chunk_count
    }

    /// Trailing bytes beyond the last planned chunk boundary
    ///
    /// Workers read these as one extra, short part.
    pub fn remainder(&self) -> u64 {
        self.size - self.planned_coverage()
    }
}

/// The arithmetic progression of chunk indices owned by one worker
///
/// Worker `i` of `P` owns `{i, i + P, i + 2P, ...}`; the assignments of all
/// `P` workers partition the non-negative integers by `index % P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrideAssignment {
    worker: u64,
    stride: u64,
}

impl StrideAssignment {
    /// Assignment for `worker` out of `stride` workers
    pub fn new(worker: u64, stride: u64) -> Result<Self> {
        if stride == 0 {
            return Err(Error::InvalidPlan("parallelism must be at least 1".into()));
        }
        if worker >= stride {
            return Err(Error::InvalidPlan(format!(
                "worker {} out of range for parallelism {}",
                worker, stride
            )));
        }
        Ok(Self { worker, stride })
    }

    /// Assignments for every worker of a pool of `parallelism`
    pub fn all(parallelism: u64) -> Result<Vec<Self>> {
        (0..parallelism.max(1))
            .map(|worker| Self::new(worker, parallelism))
            .collect()
    }

    /// Index of the owning worker
    pub fn worker(&self) -> u64 {
        self.worker
    }

    /// Number of workers in the pool
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Absolute chunk index of this worker's `n`-th chunk
    pub fn index(&self, n: u64) -> u64 {
        n * self.stride + self.worker
    }

    /// Whether `index` belongs to this worker
    pub fn owns(&self, index: u64) -> bool {
        index % self.stride == self.worker
    }

    /// Unbounded iterator over the owned chunk indices
    pub fn indices(&self) -> impl Iterator<Item = u64> {
        let this = *self;
        (0..).map(move |n| this.index(n))
    }
}
