use crate::scan::{
    config::ScanConfig,
    error::{Result, ScanError},
    output::RecordSink,
    streaming::chunk::Chunk,
    telemetry,
};
use pipal::{Bucket, CachedReader, DigitReader, PageCache, PalindromeRecord, RawRead, ResultSet};
use std::{io::SeekFrom, sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;

/// Everything a worker needs to process chunks; shared by all workers.
pub struct ScanContext<B: Bucket, S: RecordSink> {
    pub set: ResultSet,
    pub bucket: Arc<B>,
    pub sink: Arc<S>,
    pub config: Arc<ScanConfig>,
    /// Pages shared by every chunk read of the run, when caching is on.
    pub cache: Option<PageCache>,
    pub token: CancellationToken,
}

impl<B: Bucket, S: RecordSink> ScanContext<B, S> {
    pub fn new(
        set: ResultSet,
        bucket: Arc<B>,
        sink: Arc<S>,
        config: ScanConfig,
        token: CancellationToken,
    ) -> Self {
        let cache = config
            .cache
            .map(|cache| PageCache::new(cache.page_size, cache.pages));
        Self {
            set,
            bucket,
            sink,
            config: Arc::new(config),
            cache,
            token,
        }
    }
}

/// Fetches, scans, and writes one chunk. Returns the number of records
/// written.
///
/// `buf` is reused across chunks by the calling worker.
///
/// # Errors
///
/// - [`ScanError::Fetch`] when the digits could not be read.
/// - [`ScanError::Output`] when the sink failed.
/// - [`ScanError::Cancelled`] when the run was cancelled before the records
///   were written. A chunk dequeued after cancellation is never fetched;
///   digits fetched by then are discarded.
pub async fn process_chunk<B: Bucket, S: RecordSink>(
    _worker_id: usize,
    chunk: &Chunk,
    ctx: &ScanContext<B, S>,
    buf: &mut Vec<u8>,
) -> Result<usize> {
    if ctx.token.is_cancelled() {
        return Err(ScanError::Cancelled);
    }
    let started = Instant::now();
    buf.resize(chunk.length, 0);

    fetch_with_retry(_worker_id, chunk, ctx, buf).await?;
    if ctx.token.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let digits: &[u8] = buf;
    let owned = chunk.owned_centers(ctx.config.overlap);
    let records: Vec<_> =
        pipal::find_palindromes(digits, chunk.safe_offset(ctx.config.safe_offset))
            .filter(|p| owned.contains(&(chunk.start + p.center as u64)))
            .map(|p| PalindromeRecord::new(chunk.start, digits, p))
            .collect();

    ctx.sink
        .write_chunk(chunk, &records)
        .await
        .map_err(|source| ScanError::Output {
            chunk: chunk.id,
            source,
        })?;

    telemetry::increment_chunks_processed();
    telemetry::increment_digits_scanned(chunk.length as u64);
    telemetry::increment_palindromes_found(records.len() as u64);
    telemetry::record_chunk_duration(started.elapsed().as_secs_f64() * 1_000.0);

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Worker {_worker_id} scanned digits {} + {} ({} palindromes)",
        chunk.start,
        chunk.length,
        records.len()
    );

    Ok(records.len())
}

/// Reads the chunk's digits into `buf`, retrying transient failures with
/// exponential backoff. Backoff sleeps end early on cancellation.
async fn fetch_with_retry<B: Bucket, S: RecordSink>(
    _worker_id: usize,
    chunk: &Chunk,
    ctx: &ScanContext<B, S>,
    buf: &mut [u8],
) -> Result<()> {
    let policy = ctx.config.retry;
    let mut backoff = policy.backoff();
    let mut attempt = 1;

    loop {
        match fetch_chunk(chunk, ctx, buf).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = backoff.next_delay();
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Worker {_worker_id} chunk {} attempt {attempt}/{} failed: {e}; retrying in {delay:?}",
                    chunk.id,
                    policy.max_attempts,
                );
                telemetry::increment_retries();

                tokio::select! {
                    biased;
                    () = ctx.token.cancelled() => return Err(ScanError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(source) => {
                return Err(ScanError::Fetch {
                    chunk: chunk.id,
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}

/// One fetch attempt over a fresh reader. Pages already in the run's cache
/// are not fetched again.
async fn fetch_chunk<B: Bucket, S: RecordSink>(
    chunk: &Chunk,
    ctx: &ScanContext<B, S>,
    buf: &mut [u8],
) -> pipal::Result<()> {
    let raw = ctx.set.reader(Arc::clone(&ctx.bucket));
    match &ctx.cache {
        Some(cache) => {
            let cached = CachedReader::with_cache(raw, cache.clone());
            read_digits(cached, chunk.start, buf).await
        }
        None => read_digits(raw, chunk.start, buf).await,
    }
}

async fn read_digits<R: RawRead>(raw: R, start: u64, buf: &mut [u8]) -> pipal::Result<()> {
    let mut reader = DigitReader::new(raw);
    let read = match reader.seek(SeekFrom::Start(start)) {
        Ok(_) => reader.read_exact(buf).await,
        Err(e) => Err(e),
    };
    reader.close().await?;
    read
}
