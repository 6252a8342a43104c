use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle the guest uses to address a drawing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextHandle(pub u32);

/// Canvas size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid canvas {axis} '{value}'")]
pub struct CanvasSizeError {
    pub axis: &'static str,
    pub value: String,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse the decimal strings the page reports on resize.
    pub fn parse(width: &str, height: &str) -> Result<Self, CanvasSizeError> {
        let dim = |axis: &'static str, value: &str| {
            value.trim().parse::<u32>().map_err(|_| CanvasSizeError {
                axis,
                value: value.to_string(),
            })
        };
        Ok(Self {
            width: dim("width", width)?,
            height: dim("height", height)?,
        })
    }
}

/// Everything a plot call needs to know about the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasFrame {
    pub context: ContextHandle,
    pub size: CanvasSize,
}

/// The collaborator that owns the canvas (sizing, focus, the drawing
/// context). The bridge only asks it for the current frame and to clear it.
pub trait ViewportController: Send + Sync {
    fn frame(&self) -> CanvasFrame;

    fn clear(&self);
}

/// A viewport without a display, for native hosts and tests.
#[derive(Debug)]
pub struct HeadlessViewport {
    context: ContextHandle,
    size: Mutex<CanvasSize>,
    clears: AtomicUsize,
}

impl HeadlessViewport {
    pub fn new(context: ContextHandle, size: CanvasSize) -> Self {
        Self {
            context,
            size: Mutex::new(size),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn resize(&self, size: CanvasSize) {
        let mut current = self.size.lock().unwrap_or_else(|e| e.into_inner());
        *current = size;
    }

    /// Number of times the canvas has been cleared.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl ViewportController for HeadlessViewport {
    fn frame(&self) -> CanvasFrame {
        let size = *self.size.lock().unwrap_or_else(|e| e.into_inner());
        CanvasFrame {
            context: self.context,
            size,
        }
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canvas_size() {
        assert_eq!(CanvasSize::parse("1920", " 1080 "), Ok(CanvasSize::new(1920, 1080)));
        let err = CanvasSize::parse("wide", "10").unwrap_err();
        assert_eq!(err.axis, "width");
        assert!(CanvasSize::parse("10", "-4").is_err());
    }

    #[test]
    fn test_headless_resize_and_clear() {
        let vp = HeadlessViewport::new(ContextHandle(3), CanvasSize::new(800, 600));
        vp.resize(CanvasSize::new(1024, 768));
        vp.clear();
        let frame = vp.frame();
        assert_eq!(frame.context, ContextHandle(3));
        assert_eq!(frame.size, CanvasSize::new(1024, 768));
        assert_eq!(vp.clear_count(), 1);
    }
}
