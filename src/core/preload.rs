//! Block preload: fills the frame cache, then waits for `start_playback`
//!
//! # Time budget
//!
//! Each tick loads `cache_batch_size` images at a time until
//! `preload_budget_ms` of wall-clock time has passed. At least one batch is
//! loaded per tick, so a zero budget still makes progress.
//!
//! # Playback start
//!
//! `start_playback` arms the earliest start tick at
//! `tick + playback_delay * screen_fps`. Repeated commands keep the earliest
//! of all requested ticks. Playback begins once the cache is complete and the
//! earliest tick is reached.

use log::{info, warn};
use std::time::Instant;

use crate::core::block_data::{BlockData, Sources};
use crate::core::commands::START_PLAYBACK;
use crate::core::draw::DrawCommand;
use crate::core::playback::SequencePlayback;
use crate::core::state::{HandleTick, StateOutput, TickContext};
use crate::entities::{BlockInfo, Marker, Technical};
use crate::error::PlaybackError;

#[derive(Debug)]
pub struct BlockPreload {
    tick: u64,
    data: BlockData,
    earliest: Option<f64>,
    caching_complete: bool,
    auto_play: bool,
}

impl BlockPreload {
    /// Resolve the block's sequences; fails on an empty block or sequence
    pub fn new(block: &BlockInfo, sources: &Sources, auto_play: bool) -> Result<Self, PlaybackError> {
        Ok(Self {
            tick: 0,
            data: BlockData::new(block, sources)?,
            earliest: None,
            caching_complete: false,
            auto_play,
        })
    }

    pub fn progress(&self) -> f64 {
        self.data.progress()
    }

    /// Earliest state tick playback may start at, once requested
    pub fn earliest_start(&self) -> Option<f64> {
        self.earliest
    }

    fn load_images(&mut self, ctx: &TickContext<'_>) -> Result<(), PlaybackError> {
        if self.data.is_complete() {
            return Ok(());
        }

        let batch = ctx.config.cache_batch_size.max(1);
        let budget = ctx.config.preload_budget();
        let start = Instant::now();
        loop {
            self.data.cache_batch(batch)?;
            if self.data.is_complete() || start.elapsed() >= budget {
                break;
            }
        }
        Ok(())
    }
}

impl HandleTick for BlockPreload {
    fn name(&self) -> &'static str {
        "BlockPreload"
    }

    fn handle(mut self, ctx: &mut TickContext<'_>) -> Result<StateOutput, PlaybackError> {
        let mut markers: Vec<Marker> = Vec::new();
        let mut draws = Vec::new();

        if ctx.config.display_debug_information {
            let status = if self.caching_complete { "cached" } else { "caching..." };
            draws.push(DrawCommand::text(status, (20, 50), 20));
            draws.push(DrawCommand::text(
                format!("{:.1} %", self.data.progress() * 100.0),
                (20, 80),
                20,
            ));
        }
        draws.push(DrawCommand::FixationCross);

        if self.tick == 0 && self.auto_play {
            ctx.commands.push(START_PLAYBACK);
        }
        if ctx.commands.take(START_PLAYBACK) {
            let after_delay = self.tick as f64 + ctx.config.playback_delay * ctx.config.screen_fps;
            let earliest = self.earliest.map_or(after_delay, |e| e.min(after_delay));
            info!("Playback requested, earliest start at preload tick {}", earliest);
            self.earliest = Some(earliest);
        }

        self.load_images(ctx)?;

        if self.data.is_complete() && !self.caching_complete {
            info!("Preload completed: {} images", self.data.len());
            markers.push(Technical::PreloadCompleted.into());
            self.caching_complete = true;
        }

        let ready = self.earliest.is_some_and(|e| self.tick as f64 >= e);
        if self.caching_complete && ready {
            markers.push(Technical::PreSeqStart.into());

            match ctx.config.dump_block_settings() {
                Ok(Some(path)) => info!("Block settings written to {}", path.display()),
                Ok(None) => {}
                Err(e) => warn!("Failed to dump block settings: {:#}", e),
            }
            info!(
                "Starting block playback, {} v{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            );

            return Ok(StateOutput {
                markers,
                draws,
                next: SequencePlayback::new(0, self.data).into(),
            });
        }

        self.tick += 1;
        Ok(StateOutput {
            markers,
            draws,
            next: self.into(),
        })
    }
}
