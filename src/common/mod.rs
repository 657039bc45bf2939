pub mod ring;
pub mod seqlock;
pub mod state;

use once_cell::sync::Lazy;
use std::time::Instant;

/// Point in virtual-desktop pixels. The virtual-desktop origin can be
/// negative on multi-monitor setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

/// Rectangle in virtual-desktop pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint {
            x: (self.left + self.right) / 2,
            y: (self.top + self.bottom) / 2,
        }
    }

    /// Whether this rectangle may be published to shared state. A text caret
    /// can legitimately be zero pixels wide, so width zero is allowed;
    /// degenerate heights, absurd sizes, and far-off-screen positions are not.
    pub fn is_valid(&self) -> bool {
        let w = self.width();
        let h = self.height();
        if w < 0 || h <= 0 {
            return false;
        }
        if w > 10_000 || h > 10_000 {
            return false;
        }
        if self.left < -5_000 || self.top < -5_000 {
            return false;
        }
        true
    }
}

/// Commands flowing from the input actor to the render actor through the
/// SPSC ring. One byte, copied by value through the ring slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZoomCommand {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ToggleEngage,
    ToggleRelease,
    TrayToggle,
    ToggleInvert,
    OpenSettings,
}

/// Which input drives the viewport offset this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingSource {
    Pointer,
    Focus,
    Caret,
}

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic milliseconds since process start. All inter-actor timestamps
/// (keyboard activity, focus changes, arbitration) use this clock.
pub fn monotonic_ms() -> i64 {
    EPOCH.elapsed().as_millis() as i64
}
