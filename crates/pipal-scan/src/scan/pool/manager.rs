//! Worker pool for a scan run.
//!
//! [`run_scan`] wires the pieces together: one feeder pushes planned chunks
//! into a bounded queue, and [`WorkerPool`] runs `num_workers` tasks that
//! share the receiving end. Every task shares one [`CancellationToken`]; a
//! failing worker cancels it, as does a shutdown signal from outside.

use crate::scan::{
    error::{Result, ScanError},
    output::RecordSink,
    pool::worker::{WorkerStats, worker_loop},
    streaming::{
        chunk::{Chunk, ChunkPlan},
        coordinator::feed_chunks,
        processor::ScanContext,
    },
};
use pipal::Bucket;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub chunks_queued: usize,
    pub chunks_processed: usize,
    pub palindromes: usize,
}

/// A set of worker tasks sharing one chunk queue.
pub struct WorkerPool {
    handles: Vec<(usize, JoinHandle<Result<WorkerStats>>)>,
    token: CancellationToken,
}

impl WorkerPool {
    /// Spawns `num_workers` workers pulling from `rx`.
    pub fn spawn<B: Bucket, S: RecordSink>(
        num_workers: usize,
        rx: mpsc::Receiver<Chunk>,
        ctx: &Arc<ScanContext<B, S>>,
    ) -> Self {
        let rx = Arc::new(Mutex::new(rx));
        let handles = (0..num_workers)
            .map(|worker_id| {
                let task = worker_loop(worker_id, Arc::clone(&rx), Arc::clone(ctx));
                #[cfg(feature = "tracing")]
                let task = {
                    use tracing::Instrument;
                    task.instrument(tracing::info_span!("worker", worker_id))
                };
                (worker_id, tokio::spawn(task))
            })
            .collect();

        Self {
            handles,
            token: ctx.token.clone(),
        }
    }

    /// Waits for every worker and sums their work.
    ///
    /// # Errors
    ///
    /// Returns the first failure in worker order. A worker that panicked is
    /// reported as [`ScanError::Worker`] and cancels the remaining workers.
    pub async fn join(self) -> Result<WorkerStats> {
        let token = self.token;
        let outcomes = futures::future::join_all(self.handles.into_iter().map(
            |(worker_id, handle)| {
                let token = token.clone();
                async move {
                    let outcome = handle
                        .await
                        .map_err(|source| ScanError::Worker { worker_id, source })
                        .and_then(|result| result);
                    if outcome.is_err() {
                        token.cancel();
                    }
                    outcome
                }
            },
        ))
        .await;

        let mut total = WorkerStats::default();
        for outcome in outcomes {
            let stats = outcome?;
            total.chunks += stats.chunks;
            total.palindromes += stats.palindromes;
        }
        Ok(total)
    }
}

/// Scans the whole catalog from `ctx.config.start`.
///
/// # Errors
///
/// Returns the first chunk failure, or [`ScanError::Cancelled`] if the run
/// was cancelled from outside before every chunk was processed.
pub async fn run_scan<B: Bucket, S: RecordSink>(ctx: ScanContext<B, S>) -> Result<ScanSummary> {
    let ctx = Arc::new(ctx);
    let config = Arc::clone(&ctx.config);
    let total = ctx.set.total_digits();

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Scanning digits {}..{total} in chunks of {} (overlap {}) with {} workers",
        config.start,
        config.chunk_size,
        config.overlap,
        config.num_workers
    );

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let pool = WorkerPool::spawn(config.num_workers, rx, &ctx);

    let plan = ChunkPlan::new(config.start, total, config.chunk_size, config.overlap);
    let chunks_queued = feed_chunks(plan, tx, ctx.token.clone()).await;
    let stats = pool.join().await?;

    if ctx.token.is_cancelled() {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            "Run cancelled after {} of {chunks_queued} queued chunks",
            stats.chunks
        );
        return Err(ScanError::Cancelled);
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Scan complete: {} chunks, {} palindromes",
        stats.chunks,
        stats.palindromes
    );

    Ok(ScanSummary {
        chunks_queued,
        chunks_processed: stats.chunks,
        palindromes: stats.palindromes,
    })
}
