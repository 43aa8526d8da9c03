//! Test doubles shared by the core unit tests

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::block_data::Sources;
use crate::core::draw::{DrawCommand, Renderer};
use crate::core::sink::MarkerSink;
use crate::entities::{FrameImage, FrameInfo, ImageLoader, Marker, MarkerTuple, MemorySource};
use crate::error::LoadError;

/// Image loader producing 2x2 images and recording every load
#[derive(Default)]
pub struct CountingLoader {
    loaded: Mutex<Vec<PathBuf>>,
    failing: Vec<PathBuf>,
}

impl CountingLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Loader reporting `Missing` for the given references
    pub fn failing(paths: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            loaded: Mutex::new(Vec::new()),
            failing: paths.iter().map(PathBuf::from).collect(),
        })
    }

    pub fn loaded(&self) -> Vec<PathBuf> {
        self.loaded.lock().unwrap().clone()
    }
}

impl ImageLoader for CountingLoader {
    fn load_image(&self, path: &Path) -> Result<FrameImage, LoadError> {
        if self.failing.iter().any(|p| p == path) {
            return Err(LoadError::Missing(path.to_path_buf()));
        }
        self.loaded.lock().unwrap().push(path.to_path_buf());
        Ok(FrameImage::solid(2, 2, [255, 255, 255, 255]))
    }
}

/// Frames without markers
pub fn frames(files: &[&str]) -> Vec<FrameInfo> {
    files.iter().map(|f| FrameInfo::new(*f, vec![])).collect()
}

/// Frame carrying the given stimulus markers
pub fn frame_with(file: &str, markers: &[(&str, i32)]) -> FrameInfo {
    FrameInfo::new(
        file,
        markers
            .iter()
            .map(|&(name, v)| MarkerTuple {
                name: name.to_string(),
                marker: Marker(v),
            })
            .collect(),
    )
}

pub fn sources(seqs: MemorySource, loader: &Arc<CountingLoader>) -> Sources {
    let images: Arc<dyn ImageLoader> = loader.clone();
    Sources::new(Arc::new(seqs), images)
}

/// Sink keeping every marker it receives
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub markers: Arc<Mutex<Vec<Marker>>>,
}

impl RecordingSink {
    pub fn values(&self) -> Vec<i32> {
        self.markers.lock().unwrap().iter().map(|m| m.value()).collect()
    }
}

impl MarkerSink for RecordingSink {
    fn send(&mut self, marker: Marker) {
        self.markers.lock().unwrap().push(marker);
    }
}

/// Renderer keeping every draw call of the current run
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub draws: Arc<Mutex<Vec<DrawCommand>>>,
    pub presents: Arc<Mutex<usize>>,
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, cmd: &DrawCommand) {
        self.draws.lock().unwrap().push(cmd.clone());
    }

    fn present(&mut self) {
        *self.presents.lock().unwrap() += 1;
    }
}
