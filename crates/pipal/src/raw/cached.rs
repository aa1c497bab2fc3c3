use crate::{
    BlockLayout, Error, RawRead, Result,
    raw::{check_range, resolve_seek},
};
use bytes::Bytes;
use moka::future::Cache;
use std::{io::SeekFrom, sync::Arc};

pub const DEFAULT_PAGE_SIZE: u64 = 64 * 1024;
pub const DEFAULT_PAGE_CAPACITY: u64 = 64;

/// Bounded set of fixed-size raw pages, keyed by page index.
///
/// Clones share the same pages, so one cache can serve any number of
/// readers as long as they read the same result set. Concurrent misses on a
/// page are coalesced into a single fetch.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<u64, Bytes>,
    page_size: u64,
}

impl PageCache {
    /// Holds at most `capacity` pages of `page_size` bytes. Zero values are
    /// treated as one.
    pub fn new(page_size: u64, capacity: u64) -> Self {
        Self {
            pages: Cache::builder().max_capacity(capacity.max(1)).build(),
            page_size: page_size.max(1),
        }
    }

    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of pages currently cached, after pending evictions have run.
    pub async fn cached_pages(&self) -> u64 {
        self.pages.run_pending_tasks().await;
        self.pages.entry_count()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_PAGE_CAPACITY)
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("page_size", &self.page_size)
            .field("entry_count", &self.pages.entry_count())
            .finish()
    }
}

/// A [`RawRead`] decorator that serves reads from cached pages of the inner
/// stream.
///
/// Every read is turned into whole-page random reads on the inner reader, so
/// the inner cursor is never used. A failed page fetch is not cached.
pub struct CachedReader<R> {
    inner: R,
    pos: u64,
    cache: PageCache,
    closed: bool,
}

impl<R: RawRead> CachedReader<R> {
    /// Wraps `inner` with a private cache of default size.
    pub fn new(inner: R) -> Self {
        Self::with_cache(inner, PageCache::default())
    }

    /// Wraps `inner` with `cache`, which may be shared with other readers of
    /// the same result set.
    pub fn with_cache(inner: R, cache: PageCache) -> Self {
        Self {
            inner,
            pos: 0,
            cache,
            closed: false,
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    const fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    async fn page(&self, page: u64) -> Result<Bytes> {
        let page_size = self.cache.page_size;
        let fetch = async {
            let start = page * page_size;
            let len = page_size.min(self.inner.layout().total_bytes().saturating_sub(start));
            let mut buf = vec![0_u8; len as usize];
            self.inner.read_at(&mut buf, start).await?;
            Ok::<_, Error>(Bytes::from(buf))
        };
        Ok(self.cache.pages.try_get_with(page, fetch).await?)
    }
}

impl<R: RawRead> RawRead for CachedReader<R> {
    fn layout(&self) -> &Arc<BlockLayout> {
        self.inner.layout()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let remaining = self.layout().total_bytes().saturating_sub(self.pos);
        let n = (buf.len() as u64).min(remaining) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.read_at(&mut buf[..n], self.pos).await?;
        self.pos += n as u64;
        Ok(n)
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.ensure_open()?;
        check_range(offset, buf.len(), self.layout().total_bytes())?;

        let page_size = self.cache.page_size;
        let mut filled = 0;
        while filled < buf.len() {
            let at = offset + filled as u64;
            let page = at / page_size;
            let data = self.page(page).await?;
            let within = (at - page * page_size) as usize;
            let take = (data.len() - within).min(buf.len() - filled);
            buf[filled..filled + take].copy_from_slice(&data[within..within + take]);
            filled += take;
        }
        Ok(filled)
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.ensure_open()?;
        self.pos = resolve_seek(self.pos, self.layout().total_bytes(), pos)?;
        Ok(self.pos)
    }

    /// Closes the inner reader. Cached pages stay available to other readers
    /// sharing the cache.
    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        MemoryBucket, Radix, WordFormat,
        testutil::{PI_DEC, build_catalog},
    };

    #[tokio::test]
    async fn cached_reads_match_the_inner_stream() {
        let (bucket, set) = build_catalog(&PI_DEC[..90], Radix::Decimal, WordFormat::Packed32, 30, 0);
        let bucket = Arc::new(bucket);
        let plain = set.reader(Arc::clone(&bucket));
        let mut cached = CachedReader::with_cache(set.reader(bucket), PageCache::new(5, 64));

        let total = set.layout().total_bytes() as usize;
        let mut expected = vec![0_u8; total];
        plain.read_at(&mut expected, 0).await.unwrap();

        let mut got = Vec::new();
        let mut buf = [0_u8; 7];
        loop {
            let n = cached.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, expected);

        let mut window = [0_u8; 11];
        cached.read_at(&mut window, 13).await.unwrap();
        assert_eq!(&window[..], &expected[13..24]);
    }

    #[tokio::test]
    async fn capacity_bounds_the_cache() {
        let (bucket, set) = build_catalog(&PI_DEC[..90], Radix::Decimal, WordFormat::Packed32, 30, 0);
        let cached = CachedReader::with_cache(set.reader(Arc::new(bucket)), PageCache::new(4, 2));

        let mut buf = [0_u8; 4];
        for offset in [0, 4, 8, 12, 16, 20] {
            cached.read_at(&mut buf, offset).await.unwrap();
        }
        assert!(cached.cache().cached_pages().await <= 2);
    }

    #[tokio::test]
    async fn shared_cache_serves_another_reader() {
        let (bucket, set) = build_catalog(&PI_DEC[..90], Radix::Decimal, WordFormat::Packed32, 30, 0);
        let cache = PageCache::new(8, 64);
        let total = set.layout().total_bytes() as usize;

        let mut first = CachedReader::with_cache(set.reader(Arc::new(bucket)), cache.clone());
        let mut expected = vec![0_u8; total];
        first.read_at(&mut expected, 0).await.unwrap();
        first.close().await.unwrap();

        // Every object is gone, so only the shared pages can answer.
        let empty = Arc::new(MemoryBucket::new());
        let second = CachedReader::with_cache(set.reader(empty), cache);
        let mut got = vec![0_u8; total];
        second.read_at(&mut got, 0).await.unwrap();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_cached() {
        let (_, set) = build_catalog(&PI_DEC[..30], Radix::Decimal, WordFormat::Packed32, 30, 0);
        let cache = PageCache::new(8, 64);
        let missing = CachedReader::with_cache(set.reader(Arc::new(MemoryBucket::new())), cache.clone());

        let mut buf = [0_u8; 4];
        let err = missing.read_at(&mut buf, 0).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(cache.cached_pages().await, 0);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let (bucket, set) = build_catalog(&PI_DEC[..30], Radix::Decimal, WordFormat::Packed32, 30, 0);
        let mut cached = CachedReader::new(set.reader(Arc::new(bucket)));
        let mut buf = [0_u8; 4];
        cached.read(&mut buf).await.unwrap();

        cached.close().await.unwrap();
        cached.close().await.unwrap();
        assert!(matches!(cached.read(&mut buf).await, Err(Error::Closed)));
        assert!(matches!(cached.read_at(&mut buf, 0).await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn out_of_range_is_checked_before_fetching() {
        let (bucket, set) = build_catalog(&PI_DEC[..30], Radix::Decimal, WordFormat::Packed32, 30, 0);
        let cached = CachedReader::new(set.reader(Arc::new(bucket)));
        let total = set.layout().total_bytes();
        let mut buf = [0_u8; 2];
        assert!(matches!(
            cached.read_at(&mut buf, total - 1).await,
            Err(Error::OutOfRange { .. })
        ));
        assert_eq!(cached.cache().cached_pages().await, 0);
    }
}
