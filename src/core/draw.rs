//! Draw calls produced by the frame states
//!
//! States never touch a window: they return [`DrawCommand`]s and the
//! controller hands them to a [`Renderer`] after the tick's markers were sent.

use log::trace;

use crate::entities::FrameImage;

/// Side length of the photodiode patch in pixels
pub const OPTOMARKER_SIZE: u32 = 20;

/// Target rectangle of an image on screen, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Layout {
    /// Unscaled image centered on the screen
    pub fn centered(img_w: u32, img_h: u32, screen_w: u32, screen_h: u32) -> Self {
        Self {
            x: (screen_w as i32 - img_w as i32) / 2,
            y: (screen_h as i32 - img_h as i32) / 2,
            width: img_w,
            height: img_h,
        }
    }

    /// Photodiode patch near the top edge, slightly left of center
    pub fn optomarker(screen_w: u32, screen_h: u32) -> Self {
        Self {
            x: (0.49 * screen_w as f64) as i32,
            y: (0.02 * screen_h as f64) as i32,
            width: OPTOMARKER_SIZE,
            height: OPTOMARKER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub color: [u8; 4],
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Image { image: FrameImage, layout: Layout },
    Text { text: String, pos: (i32, i32), size: u32 },
    Overlay(OverlayStyle),
    /// White patch for a photodiode, shown for a few frames after a marker
    Optomarker(Layout),
    FixationCross,
}

impl DrawCommand {
    pub fn text(text: impl Into<String>, pos: (i32, i32), size: u32) -> Self {
        DrawCommand::Text {
            text: text.into(),
            pos,
            size,
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(self, DrawCommand::Overlay(_))
    }

    pub fn is_optomarker(&self) -> bool {
        matches!(self, DrawCommand::Optomarker(_))
    }

    pub fn is_fixation_cross(&self) -> bool {
        matches!(self, DrawCommand::FixationCross)
    }
}

/// Display backend
pub trait Renderer {
    fn draw(&mut self, cmd: &DrawCommand);

    /// Called once per tick after all draw calls
    fn present(&mut self) {}
}

/// Renderer without a display, logs draw calls at trace level
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presented frames so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, cmd: &DrawCommand) {
        match cmd {
            DrawCommand::Image { image, layout } => trace!(
                "draw image {}x{} at ({}, {})",
                image.width(),
                image.height(),
                layout.x,
                layout.y
            ),
            DrawCommand::Text { text, pos, .. } => trace!("draw text '{}' at {:?}", text, pos),
            DrawCommand::Overlay(style) => trace!("draw overlay {:?}", style.color),
            DrawCommand::Optomarker(rect) => trace!("draw optomarker at ({}, {})", rect.x, rect.y),
            DrawCommand::FixationCross => trace!("draw fixation cross"),
        }
    }

    fn present(&mut self) {
        self.frames += 1;
    }
}
