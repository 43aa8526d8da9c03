//! SEQSTIM - Image sequence stimulus playback library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (frame cache, states, controller)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod paths;
pub mod runner;

// Re-export commonly used types from core
pub use crate::core::{Controller, DrawCommand, FrameState, MarkerSink, Renderer, Sources};

// Re-export entities
pub use config::FeedbackConfig;
pub use entities::{BlockInfo, FrameImage, FrameInfo, Marker, MarkerTable, Technical};
pub use error::{LoadError, PlaybackError};
