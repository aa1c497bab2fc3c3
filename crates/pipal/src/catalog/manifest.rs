use crate::{BlockDescriptor, Error, Result, ResultSet, WordFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk description of a catalog: the word layout and every block, in
/// order.
///
/// ```json
/// {
///   "format": "ycd64",
///   "blocks": [
///     {
///       "name": "pi-0.ycd",
///       "first_digit_offset": 201,
///       "header": { "radix": 10, "block_id": 0, "block_size": 1000000000 }
///     }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    #[serde(default)]
    pub format: WordFormat,
    pub blocks: Vec<BlockDescriptor>,
}

impl CatalogManifest {
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] if `json` is not a manifest.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::invalid_catalog(format!("malformed manifest: {e}")))
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::InvalidCatalog`] if it cannot be parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let manifest = Self::from_json(&json)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %path.as_ref().display(),
            blocks = manifest.blocks.len(),
            format = ?manifest.format,
            "loaded catalog manifest"
        );

        Ok(manifest)
    }

    /// Validates the manifest into a [`ResultSet`].
    ///
    /// # Errors
    ///
    /// See [`ResultSet::new`].
    pub fn into_result_set(self) -> Result<ResultSet> {
        ResultSet::new(self.format, self.blocks)
    }
}

impl TryFrom<CatalogManifest> for ResultSet {
    type Error = Error;

    fn try_from(manifest: CatalogManifest) -> Result<Self> {
        manifest.into_result_set()
    }
}
