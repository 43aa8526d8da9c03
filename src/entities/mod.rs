//! Entities module - stimulus data types independent of the playback engine
//!
//! - Markers and the stimulus marker table
//! - Frames (metadata + decoded images) and the image loader
//! - Sequences and sequence-file parsing
//! - Block descriptors

pub mod block_info;
pub mod frame;
pub mod loader;
pub mod markers;
pub mod sequence;

pub use block_info::{BlockEntry, BlockInfo};
pub use frame::{FrameImage, FrameInfo};
pub use loader::{ImageLoader, Loader};
pub use markers::{Marker, MarkerTable, MarkerTuple, Technical};
pub use sequence::{MemorySource, SeqFileSource, Sequence, SequenceSource};
