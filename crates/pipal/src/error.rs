//! Error types for the digit stream.
//!
//! Errors fall into two families. Transport failures ([`Error::Io`] and
//! [`Error::ShortRead`]) are transient and worth retrying. Everything else is a
//! decode or range error: the request itself is wrong, or the stored data is,
//! and repeating it cannot help.

use crate::Radix;
use std::sync::Arc;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors produced while resolving, reading, or decoding digits.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A ranged read could not be opened or failed mid-transfer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A ranged read ended before delivering the bytes it was asked for.
    #[error("short read from {object} at byte {offset}: expected {expected}, got {got}")]
    ShortRead {
        object: String,
        offset: u64,
        expected: u64,
        got: u64,
    },

    /// The requested offset lies outside the readable stream.
    #[error("offset {offset} out of range (length {len})")]
    OutOfRange { offset: u64, len: u64 },

    /// A seek would move the cursor before the start of the stream.
    #[error("invalid seek to {0}")]
    InvalidSeek(i128),

    /// A stored word holds more digits than its fixed width allows.
    #[error("word {value:#x} does not fit in {digits} radix-{radix} digits")]
    WordOverflow {
        value: u64,
        radix: Radix,
        digits: usize,
    },

    /// A character outside the radix alphabet was given to the encoder.
    #[error("invalid digit {:?}", char::from(*.0))]
    InvalidDigit(u8),

    /// The block catalog violates an ordering or sizing invariant.
    #[error("invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    /// The reader was closed.
    #[error("reader is closed")]
    Closed,
}

impl Error {
    /// Whether the failure is transient and the operation may be retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ShortRead { .. })
    }

    pub(crate) fn invalid_catalog(reason: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            reason: reason.into(),
        }
    }
}

/// Recovers an owned error from one shared between the waiters of a cached
/// fetch. I/O errors keep their kind, so retryability is unchanged.
impl From<Arc<Error>> for Error {
    fn from(shared: Arc<Self>) -> Self {
        match Arc::try_unwrap(shared) {
            Ok(err) => err,
            Err(shared) => match &*shared {
                Self::Io(err) => Self::Io(std::io::Error::new(err.kind(), err.to_string())),
                Self::ShortRead {
                    object,
                    offset,
                    expected,
                    got,
                } => Self::ShortRead {
                    object: object.clone(),
                    offset: *offset,
                    expected: *expected,
                    got: *got,
                },
                Self::OutOfRange { offset, len } => Self::OutOfRange {
                    offset: *offset,
                    len: *len,
                },
                Self::InvalidSeek(pos) => Self::InvalidSeek(*pos),
                Self::WordOverflow {
                    value,
                    radix,
                    digits,
                } => Self::WordOverflow {
                    value: *value,
                    radix: *radix,
                    digits: *digits,
                },
                Self::InvalidDigit(digit) => Self::InvalidDigit(*digit),
                Self::InvalidCatalog { reason } => Self::InvalidCatalog {
                    reason: reason.clone(),
                },
                Self::Closed => Self::Closed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        let io = Error::Io(std::io::Error::other("connection reset"));
        assert!(io.is_retryable());

        let short = Error::ShortRead {
            object: "pi-0.ycd".to_string(),
            offset: 201,
            expected: 16,
            got: 3,
        };
        assert!(short.is_retryable());
    }

    #[test]
    fn decode_and_range_failures_are_not_retryable() {
        assert!(!Error::OutOfRange { offset: 10, len: 5 }.is_retryable());
        assert!(!Error::InvalidSeek(-1).is_retryable());
        assert!(!Error::Closed.is_retryable());
        assert!(!Error::InvalidDigit(b'x').is_retryable());
        assert!(
            !Error::WordOverflow {
                value: u64::MAX,
                radix: Radix::Decimal,
                digits: 19,
            }
            .is_retryable()
        );
        assert!(!Error::invalid_catalog("empty").is_retryable());
    }

    #[test]
    fn shared_errors_keep_their_retryability() {
        let io = Arc::new(Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        )));
        let waiter = Arc::clone(&io);
        let recovered = Error::from(io);
        assert!(recovered.is_retryable());
        assert!(matches!(
            &recovered,
            Error::Io(err) if err.kind() == std::io::ErrorKind::ConnectionReset
        ));
        assert!(Error::from(waiter).is_retryable());

        let range = Arc::new(Error::OutOfRange { offset: 9, len: 4 });
        let _held = Arc::clone(&range);
        assert!(matches!(
            Error::from(range),
            Error::OutOfRange { offset: 9, len: 4 }
        ));
    }
}
