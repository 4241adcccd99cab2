use crate::error::AssetError;

/// Read-only store of model assets (the host's packaged asset bundle,
/// a directory on disk, or memory).
pub trait AssetSource {
    /// Returns the full contents of asset `name`. Empty assets are an error.
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError>;

    /// Human-readable location, used in log messages.
    fn describe(&self) -> String;
}
