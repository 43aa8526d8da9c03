//! Image sequences and sequence-file parsing
//!
//! **Why**: A stimulus sequence is an ordered list of images, each optionally
//! tagged with markers that must be emitted when the image appears.
//!
//! **Used by**: Block cache (metadata for every frame), `validate` command
//!
//! # Sequence File Format
//!
//! One frame per line, tab separated:
//!
//! ```text
//! # comment lines are ignored
//! images/000000.png
//! images/000001.png	car_appears	17
//! ```
//!
//! - First field: image path, relative to the sequence file's directory
//! - Following fields: markers, either integer values or names from the
//!   [`MarkerTable`]; unknown names become `generic_stimulus`
//!
//! The format is easy to produce with `ls -1 images/*`.

use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::frame::FrameInfo;
use super::markers::{GENERIC_STIMULUS, Marker, MarkerTable};
use crate::error::SeqFileError;

/// Ordered frames sharing one playback rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    frames: Vec<FrameInfo>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, frames: Vec<FrameInfo>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    /// Source name (sequence file reference)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames(&self) -> &[FrameInfo] {
        &self.frames
    }

    pub fn frame(&self, idx: usize) -> Option<&FrameInfo> {
        self.frames.get(idx)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Resolves a sequence reference from a block descriptor into frames
pub trait SequenceSource {
    fn load_sequence(&self, reference: &str) -> Result<Sequence, SeqFileError>;
}

/// Sequence source reading tab-separated sequence files from disk
#[derive(Debug, Clone, Default)]
pub struct SeqFileSource {
    markers: MarkerTable,
}

impl SeqFileSource {
    pub fn new(markers: MarkerTable) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &MarkerTable {
        &self.markers
    }
}

impl SequenceSource for SeqFileSource {
    fn load_sequence(&self, reference: &str) -> Result<Sequence, SeqFileError> {
        let path = Path::new(reference);
        let frames = load_seq_file(path, &self.markers)?;
        info!("Loaded sequence {} ({} frames)", reference, frames.len());
        Ok(Sequence::new(reference, frames))
    }
}

/// In-memory sequence source keyed by reference name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sequences: HashMap<String, Vec<FrameInfo>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: &str, frames: Vec<FrameInfo>) {
        self.sequences.insert(reference.to_string(), frames);
    }

    pub fn with(mut self, reference: &str, frames: Vec<FrameInfo>) -> Self {
        self.insert(reference, frames);
        self
    }
}

impl SequenceSource for MemorySource {
    fn load_sequence(&self, reference: &str) -> Result<Sequence, SeqFileError> {
        self.sequences
            .get(reference)
            .map(|frames| Sequence::new(reference, frames.clone()))
            .ok_or_else(|| SeqFileError::Unknown(reference.to_string()))
    }
}

/// Read and parse a sequence file
pub fn load_seq_file(path: &Path, markers: &MarkerTable) -> Result<Vec<FrameInfo>, SeqFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| SeqFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_seq_file(path, &text, markers)
}

/// Parse sequence file contents; image paths are resolved relative to `path`'s directory
pub fn parse_seq_file(
    path: &Path,
    text: &str,
    markers: &MarkerTable,
) -> Result<Vec<FrameInfo>, SeqFileError> {
    let base = path.parent().unwrap_or(Path::new(""));
    let mut frames = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') || trimmed.is_empty() {
            continue;
        }

        let mut fields = line.trim_end_matches('\r').split('\t');
        let file = fields.next().unwrap_or("").trim();
        if file.is_empty() {
            return Err(SeqFileError::EmptyReference {
                path: path.to_path_buf(),
                line: line_no + 1,
            });
        }

        let tokens: Vec<&str> = fields.map(str::trim).filter(|t| !t.is_empty()).collect();
        let resolved = tokens.iter().map(|t| markers.resolve(t)).collect();

        frames.push(FrameInfo {
            file: base.join(file),
            markers: resolved,
            event_names: tokens.iter().map(|t| t.to_string()).collect(),
        });
    }

    debug!("Parsed {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

/// Problem found by [`validate_seq_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Same value used by several names in the marker table
    DuplicateMarkerValues(Vec<i32>),
    MissingImage { seq: PathBuf, image: PathBuf },
    UnknownMarker { seq: PathBuf, marker: Marker, image: PathBuf },
    GenericMarker { seq: PathBuf, image: PathBuf },
}

impl ValidationIssue {
    /// Warnings do not make a sequence unplayable
    pub fn is_error(&self) -> bool {
        !matches!(self, ValidationIssue::GenericMarker { .. })
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::DuplicateMarkerValues(values) => {
                write!(f, "ERROR duplicate marker values in marker table: {:?}", values)
            }
            ValidationIssue::MissingImage { seq, image } => {
                write!(f, "{} ERROR: cannot find image {}", seq.display(), image.display())
            }
            ValidationIssue::UnknownMarker { seq, marker, image } => write!(
                f,
                "{} ERROR: unknown stimulus marker {} at frame {}",
                seq.display(),
                marker,
                image.display()
            ),
            ValidationIssue::GenericMarker { seq, image } => write!(
                f,
                "{}  WARN: using '{}' marker for frame {}",
                seq.display(),
                GENERIC_STIMULUS,
                image.display()
            ),
        }
    }
}

/// Parse a sequence file and check images and markers without loading pixels
pub fn validate_seq_file(path: &Path, markers: &MarkerTable) -> Result<Vec<ValidationIssue>, SeqFileError> {
    let mut issues = Vec::new();

    let dups = markers.duplicate_values();
    if !dups.is_empty() {
        issues.push(ValidationIssue::DuplicateMarkerValues(dups));
    }

    let generic = markers.generic();
    for frame in load_seq_file(path, markers)? {
        if !frame.file.is_file() {
            issues.push(ValidationIssue::MissingImage {
                seq: path.to_path_buf(),
                image: frame.file.clone(),
            });
        }
        for marker in frame.marker_values() {
            if !markers.contains_value(marker) {
                issues.push(ValidationIssue::UnknownMarker {
                    seq: path.to_path_buf(),
                    marker,
                    image: frame.file.clone(),
                });
            }
            if marker == generic {
                issues.push(ValidationIssue::GenericMarker {
                    seq: path.to_path_buf(),
                    image: frame.file.clone(),
                });
            }
        }
    }

    Ok(issues)
}
