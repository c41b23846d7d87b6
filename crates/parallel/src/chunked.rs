//! Order-preserving chunked processing on a bounded worker pool

use std::ops::Range;

use rayon::prelude::*;
use riparian_core::{Error, Result};
use tracing::debug;

use crate::strategy::Workers;

/// Split `len` items into `chunks` contiguous ranges of `ceil(len / chunks)`
/// items each. Trailing ranges may be shorter or empty.
pub fn chunk_ranges(len: usize, chunks: usize) -> Vec<Range<usize>> {
    let chunks = chunks.max(1);
    let size = len.div_ceil(chunks).max(1);

    (0..chunks)
        .map(|i| {
            let start = (i * size).min(len);
            let end = (start + size).min(len);
            start..end
        })
        .collect()
}

/// Runs a fallible per-item function over contiguous chunks of a slice,
/// one chunk per worker, and concatenates the results by chunk index.
///
/// Output order always equals input order, regardless of which worker
/// finishes first. If any item fails, the whole call fails with the error of
/// the earliest failing item; no partial result is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkScheduler {
    workers: Workers,
}

impl ChunkScheduler {
    pub fn new(workers: Workers) -> Self {
        Self { workers }
    }

    /// Single worker, no thread pool
    pub fn sequential() -> Self {
        Self::new(Workers::Fixed(1))
    }

    pub fn workers(&self) -> Workers {
        self.workers
    }

    /// Apply `f(index, item)` to every item, preserving order.
    pub fn map_ordered<I, O, F>(&self, items: &[I], f: F) -> Result<Vec<O>>
    where
        I: Sync,
        O: Send,
        F: Fn(usize, &I) -> Result<O> + Sync,
    {
        let workers = self.workers.resolve()?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ranges = chunk_ranges(items.len(), workers);
        debug!(
            items = items.len(),
            workers,
            chunk_size = ranges[0].len(),
            "dispatching chunks"
        );

        let run_chunk = |range: Range<usize>| -> Result<Vec<O>> {
            range.map(|i| f(i, &items[i])).collect()
        };

        let per_chunk: Vec<Result<Vec<O>>> = if workers == 1 {
            ranges.into_iter().map(run_chunk).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers.min(items.len()))
                .build()
                .map_err(|e| Error::WorkerPool(e.to_string()))?;
            pool.install(|| ranges.into_par_iter().map(run_chunk).collect())
        };

        let mut merged = Vec::with_capacity(items.len());
        for chunk in per_chunk {
            merged.extend(chunk?);
        }
        Ok(merged)
    }
}
