use std::collections::HashMap;

use crate::detection::domain::asset_source::AssetSource;
use crate::error::AssetError;

/// In-memory asset bundle, for hosts that hand over model bytes directly.
#[derive(Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(name.into(), bytes);
    }
}

impl AssetSource for MemoryAssetSource {
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        match self.assets.get(name) {
            None => Err(AssetError::NotFound(name.to_string())),
            Some(bytes) if bytes.is_empty() => Err(AssetError::Empty(name.to_string())),
            Some(bytes) => Ok(bytes.clone()),
        }
    }

    fn describe(&self) -> String {
        format!("memory ({} assets)", self.assets.len())
    }
}
