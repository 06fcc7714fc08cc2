//! Drawing surface resource.
//!
//! The render systems paint through the [`DrawingSurface`] trait, a small 2D
//! immediate-mode API (shapes, text, a video passthrough). The host supplies
//! the implementation through a [`SurfaceProvider`] when a session
//! initializes; the boxed surface is then stored in the world as the
//! non-send [`Surface`] resource and only the render systems touch it.
//!
//! [`RecordingSurface`] is an in-memory implementation that keeps the display
//! list of the current frame. Tests and the headless demo use it to inspect
//! what a frame drew.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::components::screenposition::{ScreenPoint, ScreenSize};

/// RGBA colour, 8 bits per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same colour with alpha given as a 0..=1 fraction.
    pub fn with_alpha(self, alpha: f32) -> Self {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { a, ..self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let mut it = digits.chars().map(|c| c.to_digit(16).map(|v| (v * 17) as u8));
                Some(Color::rgb(it.next()??, it.next()??, it.next()??))
            }
            6 => Some(Color::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            8 => Some(Color::rgba(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
                channel(&digits[6..8])?,
            )),
            _ => None,
        }
    }
}

/// 2D painting API used by the render systems.
pub trait DrawingSurface {
    /// Size of the hosting container right now, in pixels.
    fn container_size(&self) -> ScreenSize;
    /// Current backing-store size.
    fn size(&self) -> ScreenSize;
    fn resize(&mut self, size: ScreenSize);
    fn clear(&mut self);
    /// Blit the latest camera frame as the background.
    fn draw_video_frame(&mut self);
    fn fill_rect(&mut self, origin: ScreenPoint, size: ScreenSize, color: Color);
    fn fill_vertical_gradient(&mut self, top: Color, bottom: Color);
    fn stroke_polyline(&mut self, points: &[ScreenPoint], width: f32, color: Color);
    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Color);
    fn fill_circle(&mut self, center: ScreenPoint, radius: f32, color: Color);
    fn stroke_circle(&mut self, center: ScreenPoint, radius: f32, width: f32, color: Color);
    fn draw_text(&mut self, text: &str, at: ScreenPoint, size: f32, color: Color);
}

/// Creates the drawing surface for a session.
pub trait SurfaceProvider {
    fn create_surface(&mut self) -> Result<Box<dyn DrawingSurface>, String>;
}

impl<F> SurfaceProvider for F
where
    F: FnMut() -> Result<Box<dyn DrawingSurface>, String>,
{
    fn create_surface(&mut self) -> Result<Box<dyn DrawingSurface>, String> {
        self()
    }
}

/// The session's drawing surface, stored as a non-send resource.
pub struct Surface(pub Box<dyn DrawingSurface>);

/// One recorded paint operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    VideoFrame,
    Rect {
        origin: ScreenPoint,
        size: ScreenSize,
        color: Color,
    },
    Gradient {
        top: Color,
        bottom: Color,
    },
    Polyline {
        points: Vec<ScreenPoint>,
        width: f32,
        color: Color,
    },
    Polygon {
        points: Vec<ScreenPoint>,
        color: Color,
    },
    Circle {
        center: ScreenPoint,
        radius: f32,
        color: Color,
        filled: bool,
    },
    Text {
        text: String,
        at: ScreenPoint,
        size: f32,
        color: Color,
    },
}

#[derive(Debug, Default)]
struct Recording {
    container: ScreenSize,
    size: ScreenSize,
    commands: Vec<DrawCommand>,
    clears: u64,
    resizes: u64,
}

/// Display-list surface. Clones share the same recording.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingSurface {
    pub fn new(container: ScreenSize) -> Self {
        let surface = Self::default();
        surface.inner.borrow_mut().container = container;
        surface
    }

    /// Simulate the host resizing the container.
    pub fn set_container_size(&self, size: ScreenSize) {
        self.inner.borrow_mut().container = size;
    }

    /// Commands drawn since the last clear.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.inner.borrow().commands.clone()
    }

    /// Number of frames cleared so far.
    pub fn clear_count(&self) -> u64 {
        self.inner.borrow().clears
    }

    pub fn resize_count(&self) -> u64 {
        self.inner.borrow().resizes
    }

    fn push(&self, command: DrawCommand) {
        self.inner.borrow_mut().commands.push(command);
    }
}

impl DrawingSurface for RecordingSurface {
    fn container_size(&self) -> ScreenSize {
        self.inner.borrow().container
    }

    fn size(&self) -> ScreenSize {
        self.inner.borrow().size
    }

    fn resize(&mut self, size: ScreenSize) {
        let mut rec = self.inner.borrow_mut();
        if rec.size != size {
            rec.size = size;
            rec.resizes += 1;
        }
    }

    fn clear(&mut self) {
        let mut rec = self.inner.borrow_mut();
        rec.commands.clear();
        rec.clears += 1;
    }

    fn draw_video_frame(&mut self) {
        self.push(DrawCommand::VideoFrame);
    }

    fn fill_rect(&mut self, origin: ScreenPoint, size: ScreenSize, color: Color) {
        self.push(DrawCommand::Rect {
            origin,
            size,
            color,
        });
    }

    fn fill_vertical_gradient(&mut self, top: Color, bottom: Color) {
        self.push(DrawCommand::Gradient { top, bottom });
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], width: f32, color: Color) {
        self.push(DrawCommand::Polyline {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn fill_polygon(&mut self, points: &[ScreenPoint], color: Color) {
        self.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f32, color: Color) {
        self.push(DrawCommand::Circle {
            center,
            radius,
            color,
            filled: true,
        });
    }

    fn stroke_circle(&mut self, center: ScreenPoint, radius: f32, _width: f32, color: Color) {
        self.push(DrawCommand::Circle {
            center,
            radius,
            color,
            filled: false,
        });
    }

    fn draw_text(&mut self, text: &str, at: ScreenPoint, size: f32, color: Color) {
        self.push(DrawCommand::Text {
            text: text.to_string(),
            at,
            size,
            color,
        });
    }
}

impl SurfaceProvider for RecordingSurface {
    fn create_surface(&mut self) -> Result<Box<dyn DrawingSurface>, String> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_variants() {
        assert_eq!(Color::from_hex("#00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("fff"), Some(Color::WHITE));
        assert_eq!(
            Color::from_hex("#FF8C0080"),
            Some(Color::rgba(255, 140, 0, 128))
        );
        assert_eq!(Color::from_hex("#12"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_with_alpha_clamps() {
        assert_eq!(Color::WHITE.with_alpha(0.0).a, 0);
        assert_eq!(Color::WHITE.with_alpha(2.0).a, 255);
        assert_eq!(Color::WHITE.with_alpha(0.3).a, 77);
    }

    #[test]
    fn test_recording_clear_resets_display_list() {
        let rec = RecordingSurface::new(ScreenSize::new(100.0, 50.0));
        let mut surface: Box<dyn DrawingSurface> = Box::new(rec.clone());
        surface.fill_circle(ScreenPoint::new(1.0, 1.0), 2.0, Color::WHITE);
        assert_eq!(rec.commands().len(), 1);
        surface.clear();
        assert!(rec.commands().is_empty());
        assert_eq!(rec.clear_count(), 1);
    }

    #[test]
    fn test_resize_counts_only_changes() {
        let rec = RecordingSurface::new(ScreenSize::new(100.0, 50.0));
        let mut surface = rec.clone();
        surface.resize(ScreenSize::new(100.0, 50.0));
        surface.resize(ScreenSize::new(100.0, 50.0));
        surface.resize(ScreenSize::new(200.0, 50.0));
        assert_eq!(rec.resize_count(), 2);
        assert_eq!(surface.size(), ScreenSize::new(200.0, 50.0));
    }

    #[test]
    fn test_commands_serialize_with_op_tag() {
        let json = serde_json::to_string(&DrawCommand::VideoFrame).unwrap();
        assert_eq!(json, r#"{"op":"video_frame"}"#);
    }
}
