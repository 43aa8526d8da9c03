//! Image loader with pluggable backends
//!
//! The block cache only knows the [`ImageLoader`] trait. The default
//! [`Loader`] decodes files with the `image` crate; embedders can supply
//! their own (e.g. pre-decoded assets, network storage).

use log::debug;
use std::path::Path;

use super::frame::FrameImage;
use crate::error::LoadError;

/// Source of decoded frame images
pub trait ImageLoader {
    /// Load the image behind a frame reference
    fn load_image(&self, path: &Path) -> Result<FrameImage, LoadError>;
}

/// Disk loader backed by the `image` crate (PNG, JPEG, TIFF, TGA, BMP)
#[derive(Debug, Default, Clone, Copy)]
pub struct Loader;

impl Loader {
    /// Load complete image file into an RGBA payload
    pub fn load(path: &Path) -> Result<FrameImage, LoadError> {
        debug!("Loading image: {}", path.display());

        if !path.exists() {
            return Err(LoadError::Missing(path.to_path_buf()));
        }

        let img = image::open(path).map_err(|source| LoadError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(FrameImage::from_rgba(img.to_rgba8()))
    }
}

impl ImageLoader for Loader {
    fn load_image(&self, path: &Path) -> Result<FrameImage, LoadError> {
        Loader::load(path)
    }
}
