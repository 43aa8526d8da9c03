//! Frame states and their per-tick contract
//!
//! Exactly one [`FrameState`] is active. Each tick the controller moves it out,
//! calls [`HandleTick::handle`] and installs the returned `next` state. A state
//! carries only its own data, including its tick counter: the counter starts
//! at 0 on construction and grows by one every time a state returns itself.
//!
//! ```text
//! Standby --start_preload--> BlockPreload --cached + start_playback--> SequencePlayback(0)
//!    ^                                                                      |
//!    |                                                       last frame     v
//!    +---- last sequence ---- SequencePlayback(i) <---- IntraBlockPause <---+
//! ```

use enum_dispatch::enum_dispatch;

use crate::config::FeedbackConfig;
use crate::core::block_data::Sources;
use crate::core::commands::CommandQueue;
use crate::core::draw::DrawCommand;
use crate::core::pause::IntraBlockPause;
use crate::core::playback::SequencePlayback;
use crate::core::preload::BlockPreload;
use crate::core::standby::Standby;
use crate::entities::Marker;
use crate::error::PlaybackError;

/// Everything a state may read or consume during one tick
pub struct TickContext<'a> {
    pub config: &'a mut FeedbackConfig,
    pub commands: &'a mut CommandQueue,
    pub controls: &'a mut CommandQueue,
    pub sources: &'a Sources,
}

/// Result of one tick: markers to send, then draw calls, then the state to install
#[derive(Debug)]
pub struct StateOutput {
    pub markers: Vec<Marker>,
    pub draws: Vec<DrawCommand>,
    pub next: FrameState,
}

impl StateOutput {
    pub fn new(next: impl Into<FrameState>) -> Self {
        Self {
            markers: Vec::new(),
            draws: Vec::new(),
            next: next.into(),
        }
    }
}

#[enum_dispatch]
pub trait HandleTick {
    fn name(&self) -> &'static str;

    /// Consume one tick
    fn handle(self, ctx: &mut TickContext<'_>) -> Result<StateOutput, PlaybackError>;
}

#[enum_dispatch(HandleTick)]
#[derive(Debug)]
pub enum FrameState {
    Standby,
    BlockPreload,
    SequencePlayback,
    IntraBlockPause,
}

impl Default for FrameState {
    fn default() -> Self {
        Standby::new().into()
    }
}

impl FrameState {
    pub fn is_standby(&self) -> bool {
        matches!(self, FrameState::Standby(_))
    }
}
