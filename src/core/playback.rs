//! Playback of one sequence of the block, one frame per tick
//!
//! The state tick is the frame index. On its first tick the sequence takes
//! over `screen_fps`, so the driver paces the following ticks at the
//! sequence's own rate.

use log::info;

use crate::config::seconds_to_frames;
use crate::core::block_data::BlockData;
use crate::core::commands::TRIGGER_OVERLAY;
use crate::core::draw::{DrawCommand, Layout, OverlayStyle};
use crate::core::pause::IntraBlockPause;
use crate::core::standby::Standby;
use crate::core::state::{FrameState, HandleTick, StateOutput, TickContext};
use crate::entities::{Marker, Technical};
use crate::error::PlaybackError;

/// Sync marker period in frames
const SYNC_PERIOD: u64 = 50;

#[derive(Debug)]
pub struct SequencePlayback {
    tick: u64,
    seq: usize,
    /// Overlay is drawn while `tick < overlay_end`
    overlay_end: u64,
    /// Last frame that sent at least one marker
    last_marker_tick: Option<u64>,
    data: BlockData,
}

impl SequencePlayback {
    pub fn new(seq: usize, data: BlockData) -> Self {
        Self {
            tick: 0,
            seq,
            overlay_end: 0,
            last_marker_tick: None,
            data,
        }
    }

    pub fn sequence_index(&self) -> usize {
        self.seq
    }

    pub fn frame_index(&self) -> usize {
        self.tick as usize
    }

    fn optomarker_visible(&self, frames: u64) -> bool {
        self.last_marker_tick.is_some_and(|last| self.tick - last < frames)
    }
}

impl HandleTick for SequencePlayback {
    fn name(&self) -> &'static str {
        "SequencePlayback"
    }

    fn handle(mut self, ctx: &mut TickContext<'_>) -> Result<StateOutput, PlaybackError> {
        let idx = self.tick as usize;
        let (name, fps, frame_count) = {
            let entry = self.data.sequence(self.seq);
            (entry.sequence.name().to_string(), entry.fps, entry.sequence.len())
        };
        assert!(idx < frame_count, "frame {} out of range for {}", idx, name);

        let mut markers: Vec<Marker> = Vec::new();
        let mut draws = Vec::new();
        let config = &mut *ctx.config;

        if ctx.controls.take_matching(TRIGGER_OVERLAY) > 0 {
            self.overlay_end = self.tick + seconds_to_frames(config.overlay_duration, config.screen_fps);
        }

        if self.tick == 0 {
            info!("Sequence {} started: {} ({} frames @ {} fps)", self.seq, name, frame_count, fps);
            markers.push(Technical::SeqStart.into());
            config.screen_fps = fps as f64;
        }

        let frame = self.data.get_frame_info(self.seq, idx);
        markers.extend(frame.marker_values());
        if config.sync_markers_enabled && self.tick % SYNC_PERIOD == 0 {
            markers.push(Technical::Sync50Frames.into());
        }
        if !markers.is_empty() {
            self.last_marker_tick = Some(self.tick);
        }

        let debug_text = config.display_debug_information.then(|| {
            let bottom = config.screen_height as i32;
            vec![
                DrawCommand::text(name.clone(), (20, 50), 20),
                DrawCommand::text(format!("Frame {}/{}", idx, frame_count), (20, 80), 20),
                DrawCommand::text(frame.event_names.join(" "), (20, bottom - 60), 20),
                DrawCommand::text(frame.marker_names(), (20, bottom - 30), 20),
            ]
        });

        let image = self.data.get_frame_image(self.seq, idx)?;
        let layout = Layout::centered(image.width(), image.height(), config.screen_width, config.screen_height);
        draws.push(DrawCommand::Image { image, layout });
        draws.extend(debug_text.into_iter().flatten());
        if self.tick < self.overlay_end {
            draws.push(DrawCommand::Overlay(OverlayStyle {
                color: config.overlay_color,
            }));
        }
        if config.optomarker_enabled && self.optomarker_visible(config.optomarker_frames) {
            draws.push(DrawCommand::Optomarker(Layout::optomarker(
                config.screen_width,
                config.screen_height,
            )));
        }

        if idx + 1 < frame_count {
            self.tick += 1;
            return Ok(StateOutput {
                markers,
                draws,
                next: self.into(),
            });
        }

        markers.push(Technical::SeqEnd.into());
        info!("Sequence {} finished: {}", self.seq, name);
        let next: FrameState = if self.seq + 1 < self.data.sequence_count() {
            let next_seq = SequencePlayback::new(self.seq + 1, self.data);
            IntraBlockPause::new(config.inter_sequence_delay, config.screen_fps, next_seq.into()).into()
        } else {
            info!("Block finished");
            Standby::new().into()
        };

        Ok(StateOutput { markers, draws, next })
    }
}
