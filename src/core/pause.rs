//! Fixation cross between two sequences of a block

use crate::config::seconds_to_frames;
use crate::core::draw::DrawCommand;
use crate::core::state::{FrameState, HandleTick, StateOutput, TickContext};
use crate::entities::{Marker, Technical};
use crate::error::PlaybackError;

#[derive(Debug)]
pub struct IntraBlockPause {
    tick: u64,
    delay_frames: u64,
    next: Box<FrameState>,
}

impl IntraBlockPause {
    /// `delay_seconds` is converted to ticks at the current screen rate
    pub fn new(delay_seconds: f64, screen_fps: f64, next: FrameState) -> Self {
        Self {
            tick: 0,
            delay_frames: seconds_to_frames(delay_seconds, screen_fps),
            next: Box::new(next),
        }
    }

    pub fn delay_frames(&self) -> u64 {
        self.delay_frames
    }
}

impl HandleTick for IntraBlockPause {
    fn name(&self) -> &'static str {
        "IntraBlockPause"
    }

    fn handle(mut self, _ctx: &mut TickContext<'_>) -> Result<StateOutput, PlaybackError> {
        let mut markers: Vec<Marker> = Vec::new();
        if self.tick == 0 {
            markers.push(Technical::IntraBlockPauseStart.into());
        }
        let draws = vec![DrawCommand::FixationCross];

        if self.tick < self.delay_frames {
            self.tick += 1;
            return Ok(StateOutput {
                markers,
                draws,
                next: self.into(),
            });
        }

        markers.push(Technical::PreSeqStart.into());
        Ok(StateOutput {
            markers,
            draws,
            next: *self.next,
        })
    }
}
