//! Viewport offset math and tracking-source arbitration.
//!
//! All functions are pure over explicit screen metrics (width, height and
//! the virtual-desktop origin, which can be negative on multi-monitor
//! setups).

use crate::common::{ScreenRect, TrackingSource};

/// Caret priority holds while the keyboard was touched this recently.
pub const CARET_IDLE_TIMEOUT_MS: i64 = 500;
/// Focus changes younger than this are ignored so rapid Tab-cycling does
/// not chase intermediate elements.
pub const FOCUS_DEBOUNCE_MS: i64 = 100;
/// Fraction of the viewport width kept ahead of the caret (left-to-right
/// typing assumed).
pub const CARET_LOOKAHEAD_FRACTION: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

/// Screen metrics a single frame computes against.
#[derive(Debug, Clone, Copy)]
pub struct ScreenMetrics {
    pub width: i32,
    pub height: i32,
    pub origin_x: i32,
    pub origin_y: i32,
}

/// Proportional pointer mapping:
///
/// ```text
/// x_off = pointer_x * (1 - 1/zoom) + origin_x / zoom
/// ```
///
/// clamped to the reachable range. The desktop pixel under the pointer is
/// then exactly the pointer position at any zoom, so zoom-center stability
/// comes for free. The origin term vanishes on a desktop rooted at (0, 0)
/// and keeps the invariant intact when the virtual desktop starts at a
/// negative coordinate.
pub fn pointer_offset(
    pointer_x: i32,
    pointer_y: i32,
    zoom: f32,
    screen: ScreenMetrics,
) -> Offset {
    if zoom <= 1.0 {
        return Offset::default();
    }
    let inv = 1.0 / zoom;
    let span = 1.0 - inv;
    let ox = screen.origin_x as f32;
    let oy = screen.origin_y as f32;
    let x = (pointer_x as f32 * span + ox * inv).clamp(ox, ox + screen.width as f32 * span);
    let y = (pointer_y as f32 * span + oy * inv).clamp(oy, oy + screen.height as f32 * span);
    Offset { x, y }
}

/// Center an element rectangle in the magnified viewport.
pub fn element_offset(rect: ScreenRect, zoom: f32, screen: ScreenMetrics) -> Offset {
    if zoom <= 1.0 {
        return Offset::default();
    }
    let view_w = screen.width as f32 / zoom;
    let view_h = screen.height as f32 / zoom;
    let center = rect.center();
    let ox = screen.origin_x as f32;
    let oy = screen.origin_y as f32;
    let x = (center.x as f32 - view_w / 2.0).clamp(ox, ox + screen.width as f32 - view_w);
    let y = (center.y as f32 - view_h / 2.0).clamp(oy, oy + screen.height as f32 - view_h);
    Offset { x, y }
}

/// Element offset shifted ahead of the caret in the typing direction so the
/// user sees upcoming text, then clamped.
pub fn caret_offset(rect: ScreenRect, zoom: f32, screen: ScreenMetrics) -> Offset {
    if zoom <= 1.0 {
        return Offset::default();
    }
    let view_w = screen.width as f32 / zoom;
    let view_h = screen.height as f32 / zoom;
    let center = rect.center();
    let ox = screen.origin_x as f32;
    let oy = screen.origin_y as f32;
    let x = (center.x as f32 - view_w / 2.0 + CARET_LOOKAHEAD_FRACTION * view_w)
        .clamp(ox, ox + screen.width as f32 - view_w);
    let y = (center.y as f32 - view_h / 2.0).clamp(oy, oy + screen.height as f32 - view_h);
    Offset { x, y }
}

/// Timestamps and validity flags feeding the arbitration decision.
#[derive(Debug, Clone, Copy)]
pub struct SourceInputs {
    pub now: i64,
    pub last_pointer_move_time: i64,
    pub last_focus_change_time: i64,
    pub last_keyboard_time: i64,
    pub focus_valid: bool,
    pub caret_valid: bool,
}

/// Pick the tracking source for this frame.
///
/// Caret wins while the user is typing; a debounced focus change wins until
/// the pointer moves again; the pointer is the fallback. Any pointer
/// movement after the focus change immediately hands control back to the
/// pointer.
pub fn determine_active_source(inputs: SourceInputs) -> TrackingSource {
    if inputs.caret_valid
        && inputs.last_keyboard_time > 0
        && inputs.now - inputs.last_keyboard_time < CARET_IDLE_TIMEOUT_MS
    {
        return TrackingSource::Caret;
    }
    if inputs.focus_valid
        && inputs.last_focus_change_time > 0
        && inputs.last_focus_change_time > inputs.last_pointer_move_time
        && inputs.now - inputs.last_focus_change_time >= FOCUS_DEBOUNCE_MS
    {
        return TrackingSource::Focus;
    }
    TrackingSource::Pointer
}
