//! The per-frame hot path.
//!
//! One `frame_tick` per vsync: drain inputs, advance the zoom, pick a
//! tracking source, smooth source transitions, and forward at most one
//! transform to the compositor. No allocation, no locks, no I/O beyond the
//! one-shot transition diagnostics.

use crate::common::state::SharedState;
use crate::common::{ScreenPoint, TrackingSource, ZoomCommand};
use crate::compositor::Compositor;
use crate::render::viewport::{
    caret_offset, determine_active_source, element_offset, pointer_offset, Offset,
    ScreenMetrics, SourceInputs,
};
use crate::render::zoom::ZoomController;
use std::sync::atomic::Ordering;

/// Source-transition smoothing window.
pub const TRANSITION_MS: f32 = 200.0;

/// Pointer deadzone in pixels on a 1080-high screen; scales with height.
const DEADZONE_BASE_PX: i32 = 3;
const DEADZONE_BASE_HEIGHT: i32 = 1080;

/// Per-thread record of everything the tick carries across frames.
pub struct FrameState {
    cached_settings_version: u64,
    follow_focus: bool,
    follow_caret: bool,
    invert_enabled: bool,

    committed_pointer: ScreenPoint,
    deadzone_initialized: bool,
    last_pointer_move_time: i64,

    active_source: TrackingSource,
    transition_start: Offset,
    transition_elapsed_ms: f32,

    last_offset: Offset,
    last_zoom: f32,
    transform_ok: bool,
}

impl FrameState {
    pub fn new() -> Self {
        Self {
            // Version 0 never matches a published generation, so the first
            // frame always adopts the live settings.
            cached_settings_version: 0,
            follow_focus: true,
            follow_caret: true,
            invert_enabled: false,
            committed_pointer: ScreenPoint::default(),
            deadzone_initialized: false,
            last_pointer_move_time: 0,
            active_source: TrackingSource::Pointer,
            transition_start: Offset::default(),
            transition_elapsed_ms: TRANSITION_MS,
            last_offset: Offset::default(),
            last_zoom: 1.0,
            transform_ok: true,
        }
    }

    pub fn active_source(&self) -> TrackingSource {
        self.active_source
    }

    pub fn committed_pointer(&self) -> ScreenPoint {
        self.committed_pointer
    }
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new()
    }
}

/// One render-actor tick. `pointer_sample` is the host cursor position read
/// by the caller (the low-level hook does not reliably deliver move events
/// while fullscreen magnification is active); `None` falls back to the
/// hook-written atomics.
pub fn frame_tick<C: Compositor + ?Sized>(
    shared: &SharedState,
    zoom: &mut ZoomController,
    frame: &mut FrameState,
    compositor: &mut C,
    pointer_sample: Option<(i32, i32)>,
    now_ms: i64,
    dt_seconds: f32,
) {
    // 1. Settings refresh: one atomic load per frame, snapshot load only on
    // a version change.
    let version = shared.settings_version();
    if version != frame.cached_settings_version {
        let snap = shared.load_settings();
        zoom.apply_settings(
            snap.min_zoom,
            snap.max_zoom,
            snap.keyboard_zoom_step,
            snap.default_zoom_level,
            snap.animation_speed,
        );
        frame.follow_focus = snap.follow_keyboard_focus;
        frame.follow_caret = snap.follow_text_cursor;
        if snap.color_inversion_enabled != frame.invert_enabled {
            frame.invert_enabled = snap.color_inversion_enabled;
            compositor.set_color_inversion(frame.invert_enabled);
        }
        frame.cached_settings_version = version;
    }

    // 2. Screen metrics.
    let screen = ScreenMetrics {
        width: shared.screen_width.load(Ordering::Relaxed),
        height: shared.screen_height.load(Ordering::Relaxed),
        origin_x: shared.screen_origin_x.load(Ordering::Relaxed),
        origin_y: shared.screen_origin_y.load(Ordering::Relaxed),
    };

    // 3. Scroll drain: exactly once per frame, by this actor only.
    let scroll = shared.scroll_accumulator.swap(0, Ordering::Acquire);

    // 4. Command drain.
    while let Some(cmd) = shared.commands.pop() {
        match cmd {
            ZoomCommand::ZoomIn => zoom.apply_keyboard_step(1),
            ZoomCommand::ZoomOut => zoom.apply_keyboard_step(-1),
            ZoomCommand::ResetZoom => zoom.animate_to(1.0),
            ZoomCommand::ToggleEngage => zoom.engage_toggle(),
            ZoomCommand::ToggleRelease => zoom.release_toggle(),
            ZoomCommand::TrayToggle => zoom.tray_toggle(),
            ZoomCommand::ToggleInvert => {
                frame.invert_enabled = !frame.invert_enabled;
                compositor.set_color_inversion(frame.invert_enabled);
            }
            // Settings UI belongs to the shell; nothing to open here.
            ZoomCommand::OpenSettings => {}
        }
    }

    // 5. Apply scroll.
    if scroll != 0 {
        zoom.apply_scroll_delta(scroll);
    }

    // 6. Animation.
    zoom.tick(dt_seconds);
    let level = zoom.current_zoom();

    // 7 + 8. Pointer sampling through the deadzone filter. The committed
    // pointer only moves when the raw sample leaves the deadzone, which
    // keeps sub-pixel jitter out of the viewport.
    let (raw_x, raw_y) = pointer_sample.unwrap_or_else(|| {
        (
            shared.pointer_x.load(Ordering::Relaxed),
            shared.pointer_y.load(Ordering::Relaxed),
        )
    });
    let threshold = if screen.height > 0 {
        (DEADZONE_BASE_PX * screen.height / DEADZONE_BASE_HEIGHT).max(1)
    } else {
        DEADZONE_BASE_PX
    };
    if !frame.deadzone_initialized {
        frame.committed_pointer = ScreenPoint { x: raw_x, y: raw_y };
        frame.deadzone_initialized = true;
    } else {
        let dx = raw_x - frame.committed_pointer.x;
        let dy = raw_y - frame.committed_pointer.y;
        if dx * dx + dy * dy > threshold * threshold {
            frame.committed_pointer = ScreenPoint { x: raw_x, y: raw_y };
            frame.last_pointer_move_time = now_ms;
        }
    }

    // 9. Rectangle reads, gated by the follow settings.
    let focus_rect = shared.focus_rect.read();
    let caret_rect = shared.caret_rect.read();
    let focus_valid = frame.follow_focus && focus_rect.is_valid();
    let caret_valid = frame.follow_caret && caret_rect.is_valid();

    // 10. Source selection and target offset.
    let source = determine_active_source(SourceInputs {
        now: now_ms,
        last_pointer_move_time: frame.last_pointer_move_time,
        last_focus_change_time: shared.last_focus_change_time.load(Ordering::Acquire),
        last_keyboard_time: shared.last_keyboard_time.load(Ordering::Acquire),
        focus_valid,
        caret_valid,
    });
    let target = match source {
        TrackingSource::Pointer => pointer_offset(
            frame.committed_pointer.x,
            frame.committed_pointer.y,
            level,
            screen,
        ),
        TrackingSource::Focus => element_offset(focus_rect, level, screen),
        TrackingSource::Caret => caret_offset(caret_rect, level, screen),
    };

    // 11. Transition smoothing: ease from the last applied offset to the new
    // source's offset over ~200 ms after an arbitration change.
    if source != frame.active_source {
        frame.active_source = source;
        frame.transition_start = frame.last_offset;
        frame.transition_elapsed_ms = 0.0;
    }
    let offset = if frame.transition_elapsed_ms < TRANSITION_MS {
        let t = (frame.transition_elapsed_ms / TRANSITION_MS).clamp(0.0, 1.0);
        let ease = 1.0 - (1.0 - t) * (1.0 - t);
        frame.transition_elapsed_ms += dt_seconds * 1000.0;
        Offset {
            x: frame.transition_start.x + (target.x - frame.transition_start.x) * ease,
            y: frame.transition_start.y + (target.y - frame.transition_start.y) * ease,
        }
    } else {
        target
    };

    // 12. Publish, only on change, with the same tuple for both transforms.
    if level != frame.last_zoom || offset != frame.last_offset {
        // Both calls get the same tuple even if one of them fails.
        let fullscreen_ok = compositor.set_transform(level, offset.x, offset.y);
        let input_ok = compositor.set_input_transform(level, offset.x, offset.y);
        let ok = fullscreen_ok && input_ok;
        if ok != frame.transform_ok {
            if ok {
                tracing::info!("compositor transform recovered");
            } else {
                tracing::warn!("compositor rejected transform");
            }
            frame.transform_ok = ok;
        }
        frame.last_zoom = level;
        frame.last_offset = offset;
        shared.store_zoom_level(level);
    }
}
