//! Frame metadata and loaded image payloads
//!
//! **Why**: Metadata (file reference + markers) is known as soon as a
//! sequence file is parsed, but pixels are loaded lazily by the block cache.
//! Keeping the two apart lets playback query markers for any frame while the
//! image may still be on disk.
//!
//! # Payload
//!
//! `FrameImage` wraps an `Arc<RgbaImage>`: cloning a cached frame for a draw
//! call is a refcount bump, never a pixel copy.

use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::Arc;

use super::markers::{Marker, MarkerTuple};

/// One line of a sequence file: image reference plus its markers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// Resolved image path
    pub file: PathBuf,
    /// Markers in the order they were listed
    pub markers: Vec<MarkerTuple>,
    /// Resolved marker names, one per marker
    pub event_names: Vec<String>,
}

impl FrameInfo {
    pub fn new(file: impl Into<PathBuf>, markers: Vec<MarkerTuple>) -> Self {
        let event_names = markers.iter().map(|m| m.name.clone()).collect();
        Self {
            file: file.into(),
            markers,
            event_names,
        }
    }

    /// Marker values in stored order
    pub fn marker_values(&self) -> impl Iterator<Item = Marker> + '_ {
        self.markers.iter().map(|m| m.marker)
    }

    /// Space separated marker names (debug overlay)
    pub fn marker_names(&self) -> String {
        self.markers
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Decoded RGBA image shared between cache and renderer
#[derive(Clone, Debug)]
pub struct FrameImage {
    pixels: Arc<RgbaImage>,
}

impl FrameImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Uniform image, used as placeholder and in tests
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_rgba(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Memory footprint of the pixel buffer in bytes
    pub fn mem(&self) -> usize {
        self.pixels.as_raw().len()
    }

    /// True if both handles point at the same decoded buffer
    pub fn ptr_eq(&self, other: &FrameImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}
