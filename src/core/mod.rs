//! Core engine modules - frame cache, states, controller
//!
//! These modules form the playback engine, independent of any display or
//! marker transport.

pub mod block_data;
pub mod commands;
pub mod controller;
pub mod draw;
pub mod pause;
pub mod playback;
pub mod preload;
pub mod sink;
pub mod standby;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use block_data::{BlockData, CacheStats, Sources};
pub use commands::{CommandQueue, START_PLAYBACK, START_PRELOAD, TRIGGER_OVERLAY};
pub use controller::Controller;
pub use draw::{DrawCommand, HeadlessRenderer, Layout, OverlayStyle, Renderer};
pub use pause::IntraBlockPause;
pub use playback::SequencePlayback;
pub use preload::BlockPreload;
pub use sink::{LogSink, MarkerSink, UdpSink};
pub use standby::Standby;
pub use state::{FrameState, HandleTick, StateOutput, TickContext};
