use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::CameraError;
use crate::shared::constants::IMAGE_EXTENSIONS;

/// Image files in `dir`, sorted by file name.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decodes every image in `dir` to RGB, in file-name order.
pub fn load_frames(dir: &Path) -> Result<Vec<RgbImage>, CameraError> {
    let paths = list_frames(dir)?;
    if paths.is_empty() {
        return Err(CameraError::Frames(format!(
            "no images found in {}",
            dir.display()
        )));
    }
    paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgb8())
                .map_err(|e| CameraError::Frames(format!("{}: {e}", path.display())))
        })
        .collect()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
