// SPDX-License-Identifier: PMPL-1.0-or-later

//! Chunked map-reduce execution
//!
//! The callable universe is partitioned once, statically, and each chunk
//! is processed by an independent stateless worker. The scheduler is an
//! injected capability rather than a process-wide pool, so the whole
//! engine runs single-threaded under the sequential implementation in
//! tests. Correctness never depends on chunk boundaries; only the join
//! algebra does (see `model`).

use anyhow::Result;
use rayon::prelude::*;

/// Never schedule chunks smaller than this unless the whole universe is.
pub const MINIMUM_CHUNK_SIZE: usize = 500;

/// Preferred number of chunks per available worker.
pub const CHUNKS_PER_WORKER: usize = 1;

/// Target chunk count for a universe of `len` items.
pub fn target_chunk_count(len: usize, workers: usize) -> usize {
    let ceiling = workers.max(1) * CHUNKS_PER_WORKER;
    (len / MINIMUM_CHUNK_SIZE).clamp(1, ceiling)
}

/// Split items into `count` contiguous chunks of near-equal size,
/// preserving order. An empty input produces no chunks.
pub fn partition<T>(items: Vec<T>, count: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let chunk_size = items.len().div_ceil(count.max(1));
    let mut chunks = Vec::new();
    let mut rest = items.into_iter();
    loop {
        let chunk: Vec<T> = rest.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }
    chunks
}

/// Chunked map-reduce capability.
pub trait Scheduler {
    /// Nominal worker count, consumed by the chunk policy.
    fn workers(&self) -> usize;

    /// Map every chunk, then reduce the partial results pairwise. Returns
    /// `None` when there are no chunks. Any failing map aborts the whole
    /// run — all-or-nothing, no partial recovery.
    fn map_reduce<T, A, M, R>(&self, chunks: Vec<Vec<T>>, map: M, reduce: R) -> Result<Option<A>>
    where
        T: Send,
        A: Send,
        M: Fn(Vec<T>) -> Result<A> + Sync + Send,
        R: Fn(A, A) -> A + Sync + Send;
}

/// Trivial in-thread scheduler. The worker count only feeds the chunk
/// policy, which lets tests pin an exact partitioning.
#[derive(Debug, Clone, Copy)]
pub struct SequentialScheduler {
    workers: usize,
}

impl SequentialScheduler {
    pub fn new() -> Self {
        Self { workers: 1 }
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for SequentialScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SequentialScheduler {
    fn workers(&self) -> usize {
        self.workers
    }

    fn map_reduce<T, A, M, R>(&self, chunks: Vec<Vec<T>>, map: M, reduce: R) -> Result<Option<A>>
    where
        T: Send,
        A: Send,
        M: Fn(Vec<T>) -> Result<A> + Sync + Send,
        R: Fn(A, A) -> A + Sync + Send,
    {
        let mut accumulated: Option<A> = None;
        for chunk in chunks {
            let partial = map(chunk)?;
            accumulated = Some(match accumulated {
                Some(previous) => reduce(previous, partial),
                None => partial,
            });
        }
        Ok(accumulated)
    }
}

/// Data-parallel scheduler over the rayon pool, reducing as a tree. The
/// reduce order is unspecified, which is exactly why the join operation
/// must be associative and commutative.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonScheduler;

impl RayonScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for RayonScheduler {
    fn workers(&self) -> usize {
        rayon::current_num_threads()
    }

    fn map_reduce<T, A, M, R>(&self, chunks: Vec<Vec<T>>, map: M, reduce: R) -> Result<Option<A>>
    where
        T: Send,
        A: Send,
        M: Fn(Vec<T>) -> Result<A> + Sync + Send,
        R: Fn(A, A) -> A + Sync + Send,
    {
        let reduced = chunks
            .into_par_iter()
            .map(map)
            .try_reduce_with(|left, right| Ok(reduce(left, right)));
        match reduced {
            Some(result) => result.map(Some),
            None => Ok(None),
        }
    }
}
