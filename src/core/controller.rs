//! Tick scheduler owning the active frame state
//!
//! **Architecture**: Controller owns the state, the configuration and both
//! token queues. States borrow them through a [`TickContext`] for exactly one
//! tick and hand back their successor.
//!
//! # Tick
//!
//! 1. move the active state out (a fresh `Standby` is parked in its slot)
//! 2. `handle` it
//! 3. send the returned markers to the sink, in order
//! 4. execute the draw calls, then `present`
//! 5. install the returned state
//!
//! A failing tick leaves the parked `Standby` installed, which aborts the
//! current block, and returns the error to the driver.

use log::{error, info};
use std::time::Duration;

use crate::config::FeedbackConfig;
use crate::core::block_data::Sources;
use crate::core::commands::CommandQueue;
use crate::core::draw::Renderer;
use crate::core::sink::MarkerSink;
use crate::core::standby::Standby;
use crate::core::state::{FrameState, HandleTick, TickContext};
use crate::entities::{Marker, Technical};
use crate::error::{ConfigError, PlaybackError};

pub struct Controller {
    state: FrameState,
    config: FeedbackConfig,
    commands: CommandQueue,
    controls: CommandQueue,
    sources: Sources,
    sink: Box<dyn MarkerSink>,
    renderer: Box<dyn Renderer>,
    tick_count: u64,
    blocks_completed: u64,
}

impl Controller {
    pub fn new(
        config: FeedbackConfig,
        sources: Sources,
        sink: Box<dyn MarkerSink>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            state: FrameState::default(),
            config,
            commands: CommandQueue::new(),
            controls: CommandQueue::new(),
            sources,
            sink,
            renderer,
            tick_count: 0,
            blocks_completed: 0,
        }
    }

    /// Advance the active state by one tick
    pub fn tick(&mut self) -> Result<(), PlaybackError> {
        let state = std::mem::replace(&mut self.state, Standby::new().into());
        let from = state.name();
        let was_playing = matches!(
            state,
            FrameState::SequencePlayback(_) | FrameState::IntraBlockPause(_)
        );

        let mut ctx = TickContext {
            config: &mut self.config,
            commands: &mut self.commands,
            controls: &mut self.controls,
            sources: &self.sources,
        };
        let result = state.handle(&mut ctx);
        self.tick_count += 1;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                error!("{} failed at tick {}: {}, back to standby", from, self.tick_count - 1, e);
                return Err(e);
            }
        };

        for &marker in &output.markers {
            self.sink.send(marker);
        }
        for cmd in &output.draws {
            self.renderer.draw(cmd);
        }
        self.renderer.present();

        let to = output.next.name();
        if to != from {
            info!("State: {} -> {}", from, to);
            if was_playing && output.next.is_standby() {
                self.blocks_completed += 1;
            }
        }
        self.state = output.next;
        Ok(())
    }

    /// Abort whatever is running and return to standby
    pub fn stop(&mut self) {
        if !self.state.is_standby() {
            info!("Stop: {} -> Standby", self.state.name());
        }
        self.state = Standby::new().into();
    }

    /// Announce shutdown on the marker sink
    pub fn quit(&mut self) {
        info!("Quit after {} ticks", self.tick_count);
        self.sink.send(Technical::FeedbackQuit.into());
    }

    pub fn push_command(&mut self, token: impl Into<String>) {
        self.commands.push(token);
    }

    pub fn push_control(&mut self, token: impl Into<String>) {
        self.controls.push(token);
    }

    pub fn set_param(&mut self, name: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        self.config.set_param(name, value)
    }

    /// Send a marker outside the state machine
    pub fn send_marker(&mut self, marker: Marker) {
        self.sink.send(marker);
    }

    /// Real-time length of the next tick
    pub fn frame_duration(&self) -> Duration {
        self.config.frame_duration()
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    pub fn controls(&self) -> &CommandQueue {
        &self.controls
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Blocks that played through to their last sequence
    pub fn blocks_completed(&self) -> u64 {
        self.blocks_completed
    }
}
