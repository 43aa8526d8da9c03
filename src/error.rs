//! Error types for sequence loading, block descriptors and playback.

use std::path::PathBuf;

use thiserror::Error;

/// Image payload could not be produced for a frame reference.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot decode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image not available: {}", .0.display())]
    Missing(PathBuf),
}

impl LoadError {
    /// File reference the failed load was for
    pub fn path(&self) -> &PathBuf {
        match self {
            LoadError::Image { path, .. } => path,
            LoadError::Missing(path) => path,
        }
    }
}

/// Sequence file could not be resolved into frames.
#[derive(Error, Debug)]
pub enum SeqFileError {
    #[error("cannot read sequence file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sequence file {}, line {line}: missing image reference", .path.display())]
    EmptyReference { path: PathBuf, line: usize },

    #[error("unknown sequence: {0}")]
    Unknown(String),
}

/// Block descriptor (list of sequence/fps pairs) is malformed.
#[derive(Error, Debug)]
pub enum BlockInfoError {
    #[error("malformed block descriptor: {0}")]
    Malformed(String),

    #[error("sequence {reference} has invalid fps {fps} (must be a positive integer)")]
    InvalidFps { reference: String, fps: i64 },

    #[error("invalid character code {0} in block descriptor")]
    CharCode(f64),
}

/// Marker name table could not be loaded.
#[derive(Error, Debug)]
pub enum MarkerTableError {
    #[error("cannot read marker table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse marker table {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime configuration parameter update was rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown configuration parameter: {0}")]
    UnknownParam(String),

    #[error("invalid value for {name}: {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Block(#[from] BlockInfoError),
}

/// Fatal condition for the current block; the controller falls back to standby.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    SeqFile(#[from] SeqFileError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("block contains no sequences")]
    EmptyBlock,

    #[error("sequence {0} contains no frames")]
    EmptySequence(String),
}
