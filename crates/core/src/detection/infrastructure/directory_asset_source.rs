use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::detection::domain::asset_source::AssetSource;
use crate::error::AssetError;

/// Reads model assets from a directory on disk.
pub struct DirectoryAssetSource {
    root: PathBuf,
}

impl DirectoryAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectoryAssetSource {
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.root.join(name);
        let bytes = fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AssetError::NotFound(path.display().to_string()),
            _ => AssetError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        if bytes.is_empty() {
            return Err(AssetError::Empty(path.display().to_string()));
        }
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
