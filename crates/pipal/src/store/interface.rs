use std::io;
use tokio::io::AsyncRead;

/// A named collection of objects that support ranged reads.
///
/// Buckets are shared read-only across every worker, so implementations must
/// be safe for concurrent use. Each reader opens its own ranged-read handles.
pub trait Bucket: Send + Sync + 'static {
    type Object: Object;

    /// Resolves an object handle. Resolution is lazy: a missing object only
    /// fails when a range is opened on it.
    fn object(&self, name: &str) -> Self::Object;
}

/// A single stored object.
pub trait Object: Send + Sync {
    /// Byte stream returned by a ranged read.
    type Reader: AsyncRead + Unpin + Send + Sync;

    /// Opens a stream over `length` bytes starting at `offset`.
    ///
    /// The stream may end early if the object is shorter than the requested
    /// range; callers detect and report short data themselves.
    fn range_reader(
        &self,
        offset: u64,
        length: u64,
    ) -> impl Future<Output = io::Result<Self::Reader>> + Send;
}
