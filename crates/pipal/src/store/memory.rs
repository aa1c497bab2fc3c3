use crate::{Bucket, Object};
use bytes::Bytes;
use std::{collections::HashMap, io, sync::Arc};

/// An in-process [`Bucket`] backed by a map of byte buffers.
///
/// Cloning is cheap; clones share the same objects.
#[derive(Clone, Debug, Default)]
pub struct MemoryBucket {
    objects: Arc<HashMap<String, Bytes>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a bucket with `data` stored under `name`, replacing any
    /// previous object of that name.
    #[must_use]
    pub fn with_object(self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let mut objects = Arc::unwrap_or_clone(self.objects);
        objects.insert(name.into(), data.into());
        Self {
            objects: Arc::new(objects),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Bucket for MemoryBucket {
    type Object = MemoryObject;

    fn object(&self, name: &str) -> Self::Object {
        MemoryObject {
            name: name.to_string(),
            data: self.objects.get(name).cloned(),
        }
    }
}

/// Handle to an object in a [`MemoryBucket`].
#[derive(Clone, Debug)]
pub struct MemoryObject {
    name: String,
    data: Option<Bytes>,
}

impl Object for MemoryObject {
    type Reader = io::Cursor<Bytes>;

    async fn range_reader(&self, offset: u64, length: u64) -> io::Result<Self::Reader> {
        let data = self.data.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("object not found: {}", self.name),
            )
        })?;
        let len = data.len() as u64;
        let start = offset.min(len) as usize;
        let end = offset.saturating_add(length).min(len) as usize;
        Ok(io::Cursor::new(data.slice(start..end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn read_range(bucket: &MemoryBucket, name: &str, offset: u64, length: u64) -> Vec<u8> {
        let mut reader = bucket
            .object(name)
            .range_reader(offset, length)
            .await
            .unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn ranged_reads_return_requested_slice() {
        let bucket = MemoryBucket::new().with_object("digits", &b"0123456789"[..]);
        assert_eq!(read_range(&bucket, "digits", 2, 3).await, b"234");
        assert_eq!(read_range(&bucket, "digits", 0, 10).await, b"0123456789");
    }

    #[tokio::test]
    async fn ranges_past_the_end_are_truncated() {
        let bucket = MemoryBucket::new().with_object("digits", &b"01234"[..]);
        assert_eq!(read_range(&bucket, "digits", 3, 100).await, b"34");
        assert!(read_range(&bucket, "digits", 50, 2).await.is_empty());
    }

    #[tokio::test]
    async fn missing_object_fails_on_open() {
        let bucket = MemoryBucket::new();
        let err = bucket.object("nope").range_reader(0, 1).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
