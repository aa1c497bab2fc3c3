use crate::{Bucket, Object};
use std::{
    io::{self, SeekFrom},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, Take},
};

/// A [`Bucket`] whose objects are files under a root directory.
///
/// Useful against a local mirror of the remote shards. Object names are
/// relative paths; names that escape the root are rejected on open.
#[derive(Clone, Debug)]
pub struct FsBucket {
    root: Arc<PathBuf>,
}

impl FsBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Bucket for FsBucket {
    type Object = FsObject;

    fn object(&self, name: &str) -> Self::Object {
        FsObject {
            path: self.root.join(name),
            escapes_root: Path::new(name)
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)),
        }
    }
}

/// Handle to a file in an [`FsBucket`].
#[derive(Clone, Debug)]
pub struct FsObject {
    path: PathBuf,
    escapes_root: bool,
}

impl Object for FsObject {
    type Reader = Take<File>;

    async fn range_reader(&self, offset: u64, length: u64) -> io::Result<Self::Reader> {
        if self.escapes_root {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("object name escapes bucket root: {}", self.path.display()),
            ));
        }
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(file.take(length))
    }
}
