//! Saving render targets to image files.

use std::path::Path;

use image::{Rgb, RgbImage};
use thiserror::Error;

use crate::{Resource, UnsignedColor};

/// Errors that can occur while writing an image.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Cannot save an empty {0}x{1} image")]
    Empty(u32, u32),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert a render target into an `image` buffer.
pub fn to_rgb_image(target: &Resource<UnsignedColor>) -> RgbImage {
    RgbImage::from_fn(target.width(), target.height(), |x, y| {
        let c = target.item(x, y);
        Rgb([c.r, c.g, c.b])
    })
}

/// Write a render target to `path`. The format follows the file extension.
///
/// Missing parent directories are created.
pub fn save_resource<P: AsRef<Path>>(
    target: &Resource<UnsignedColor>,
    path: P,
) -> Result<(), SaveError> {
    let path = path.as_ref();
    if target.is_empty() {
        return Err(SaveError::Empty(target.width(), target.height()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    to_rgb_image(target).save(path)?;
    log::info!(
        "Saved {}x{} image to {:?}",
        target.width(),
        target.height(),
        path
    );
    Ok(())
}
