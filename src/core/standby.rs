//! Idle state between blocks

use log::{error, info, trace};

use crate::core::commands::START_PRELOAD;
use crate::core::draw::DrawCommand;
use crate::core::preload::BlockPreload;
use crate::core::state::{HandleTick, StateOutput, TickContext};
use crate::entities::{Marker, Technical};
use crate::error::PlaybackError;

/// Waits for `start_preload` with a non-empty `next_block_info`
#[derive(Debug, Default)]
pub struct Standby {
    tick: u64,
}

impl Standby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

impl HandleTick for Standby {
    fn name(&self) -> &'static str {
        "Standby"
    }

    fn handle(mut self, ctx: &mut TickContext<'_>) -> Result<StateOutput, PlaybackError> {
        let mut markers: Vec<Marker> = Vec::new();
        let mut draws = Vec::new();

        if self.tick == 0 {
            markers.push(Technical::StandbyStart.into());
        }
        if ctx.config.display_debug_information {
            draws.push(DrawCommand::text("Standby", (20, 50), 20));
        }

        if ctx.commands.take(START_PRELOAD) {
            if ctx.config.next_block_info.is_empty() {
                error!("start_preload without block info, staying in standby");
            } else {
                info!("Preloading block {:?}", ctx.config.next_block_info);
                let preload = BlockPreload::new(&ctx.config.next_block_info, ctx.sources, false)?;
                markers.push(Technical::StandbyEnd.into());
                return Ok(StateOutput {
                    markers,
                    draws,
                    next: preload.into(),
                });
            }
        }

        trace!("standby tick {}", self.tick);
        self.tick += 1;
        Ok(StateOutput {
            markers,
            draws,
            next: self.into(),
        })
    }
}
