use crate::scan::{
    error::{Result, ScanError},
    output::RecordSink,
    streaming::{
        chunk::Chunk,
        processor::{ScanContext, process_chunk},
    },
    telemetry,
};
use pipal::Bucket;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// What a worker got through before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub chunks: usize,
    pub palindromes: usize,
}

/// Worker task: pulls chunks from the shared queue and processes them until
/// the queue is closed and drained, or the run is cancelled.
///
/// The queue lock is only held while waiting for the next chunk, never while
/// a chunk is fetched or written. A chunk that fails cancels the whole run
/// and its error is returned; chunks still queued are left untouched.
///
/// # Arguments
///
/// - `worker_id`: Identifies the worker in logs and errors.
/// - `rx`: Receiving end of the chunk queue, shared by all workers.
/// - `ctx`: Shared catalog, bucket, sink, configuration, and cancellation
///   token.
pub async fn worker_loop<B: Bucket, S: RecordSink>(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Chunk>>>,
    ctx: Arc<ScanContext<B, S>>,
) -> Result<WorkerStats> {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    // Reused across chunks.
    let mut buf = Vec::new();
    let mut stats = WorkerStats::default();

    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                () = ctx.token.cancelled() => None,
                chunk = rx.recv() => chunk,
            }
        };
        let Some(chunk) = next else { break };

        let processed = process_chunk(worker_id, &chunk, &ctx, &mut buf);
        #[cfg(feature = "tracing")]
        let processed = {
            use tracing::Instrument;
            processed.instrument(tracing::info_span!("chunk", id = chunk.id))
        };

        match processed.await {
            Ok(found) => {
                stats.chunks += 1;
                stats.palindromes += found;
            }
            Err(ScanError::Cancelled) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} dropped chunk {} on cancellation", chunk.id);
                break;
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {worker_id} failed: {e}; cancelling run");
                telemetry::increment_chunk_failures();
                ctx.token.cancel();
                return Err(e);
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped after {} chunks", stats.chunks);
    Ok(stats)
}
