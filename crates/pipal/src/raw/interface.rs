use crate::{BlockLayout, Error, Result};
use std::{io::SeekFrom, sync::Arc};

/// A seekable, randomly addressable stream of raw packed bytes.
///
/// The offsets are positions in the concatenation of all block payloads, as
/// described by [`RawRead::layout`]. Implemented by
/// [`ResultSetReader`](crate::ResultSetReader) and decorated by
/// [`CachedReader`](crate::CachedReader).
pub trait RawRead: Send + Sync {
    /// Block layout the raw offsets refer to.
    fn layout(&self) -> &Arc<BlockLayout>;

    /// Reads up to `buf.len()` bytes at the cursor and advances it.
    ///
    /// Returns `Ok(0)` at the end of the stream or for an empty `buf`.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;

    /// Fills `buf` from `offset` without moving the cursor.
    ///
    /// Either the whole buffer is filled or an error is returned; a request
    /// reaching past the end is [`Error::OutOfRange`].
    fn read_at(&self, buf: &mut [u8], offset: u64) -> impl Future<Output = Result<usize>> + Send;

    /// Moves the cursor and returns its new position.
    fn seek(&mut self, pos: SeekFrom) -> impl Future<Output = Result<u64>> + Send;

    /// Releases open storage handles. Every later call fails with
    /// [`Error::Closed`].
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Applies `pos` to a cursor at `current` in a stream of `len` bytes.
///
/// Positions past the end are allowed; reads from there return nothing.
///
/// # Errors
///
/// Returns [`Error::InvalidSeek`] if the target would be negative or does not
/// fit in a `u64`.
pub fn resolve_seek(current: u64, len: u64, pos: SeekFrom) -> Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => i128::from(n),
        SeekFrom::Current(delta) => i128::from(current) + i128::from(delta),
        SeekFrom::End(delta) => i128::from(len) + i128::from(delta),
    };
    u64::try_from(target).map_err(|_| Error::InvalidSeek(target))
}

/// Checks that `[offset, offset + len)` lies inside a stream of `total`
/// bytes or digits.
pub(crate) fn check_range(offset: u64, len: usize, total: u64) -> Result<()> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= total => Ok(()),
        _ => Err(Error::OutOfRange { offset, len: total }),
    }
}
