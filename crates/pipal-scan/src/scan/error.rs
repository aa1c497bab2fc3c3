//! Error types for a scan run.
//!
//! ## Error Cases
//! - `Fetch`: a chunk's digits could not be read, after retries if the
//!   failure was transient.
//! - `Output`: a chunk's records could not be written.
//! - `Cancelled`: the run was cancelled while the chunk was in flight.
//! - `Worker`: a worker task panicked or was aborted.

pub type Result<T> = core::result::Result<T, ScanError>;

/// Unified error type for the scan pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Reading or decoding a chunk failed.
    #[error("chunk {chunk}: fetch failed after {attempts} attempt(s): {source}")]
    Fetch {
        chunk: u64,
        attempts: u32,
        #[source]
        source: pipal::Error,
    },

    /// The record sink failed.
    #[error("chunk {chunk}: output failed: {source}")]
    Output {
        chunk: u64,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled.
    #[error("scan cancelled")]
    Cancelled,

    /// A worker task ended abnormally.
    #[error("worker {worker_id} failed: {source}")]
    Worker {
        worker_id: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}
