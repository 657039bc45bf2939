//! Zoom level state machine.
//!
//! Pure: owned by the render thread, stepped synchronously once per frame,
//! touches no shared state. Scroll input applies immediately in log space so
//! equal scroll effort buys equal zoom ratio at any starting level; keyboard
//! steps and toggles animate with a frame-rate-independent ease-out.

use crate::settings::AnimationSpeed;

/// Snap radius around 1.0 and around the configured maximum.
pub const SNAP_EPSILON: f32 = 0.005;

/// Zoom ratio per wheel notch (120 raw units).
const NOTCH_RATIO: f32 = 1.1;
const WHEEL_NOTCH: f32 = 120.0;

/// Fraction of the log-range near a bound inside which scroll effort is
/// attenuated quadratically before the hard clamp.
const SOFT_BOUND_FRACTION: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomMode {
    Idle,
    Scrolling,
    Animating,
}

pub struct ZoomController {
    current: f32,
    target: f32,
    min_zoom: f32,
    max_zoom: f32,
    keyboard_step: f32,
    ease_rate: f32,
    mode: ZoomMode,
    toggled: bool,
    saved_for_toggle: f32,
    last_used_zoom: f32,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoomController {
    pub fn new() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            min_zoom: 1.0,
            max_zoom: 10.0,
            keyboard_step: 0.25,
            ease_rate: AnimationSpeed::Normal.ease_rate(),
            mode: ZoomMode::Idle,
            toggled: false,
            saved_for_toggle: 1.0,
            last_used_zoom: 2.0,
        }
    }

    pub fn current_zoom(&self) -> f32 {
        self.current
    }

    pub fn target_zoom(&self) -> f32 {
        self.target
    }

    pub fn mode(&self) -> ZoomMode {
        self.mode
    }

    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    fn clamp_snap(&self, zoom: f32) -> f32 {
        let z = zoom.clamp(self.min_zoom, self.max_zoom);
        if (z - 1.0).abs() < SNAP_EPSILON {
            return 1.0;
        }
        if (z - self.max_zoom).abs() < SNAP_EPSILON {
            return self.max_zoom;
        }
        z
    }

    /// Scroll effort attenuation inside the soft-bound margin. Only the
    /// bound being approached matters, and the unity minimum is exempt:
    /// there the snap rule owns the bottom of the range so scrolling out
    /// lands exactly on 1.0.
    fn attenuated_notches(&self, notches: f32) -> f32 {
        let log_min = self.min_zoom.ln();
        let log_max = self.max_zoom.ln();
        let range = log_max - log_min;
        if range <= f32::EPSILON {
            return notches;
        }
        let margin = SOFT_BOUND_FRACTION * range;
        let pos = self.current.ln();
        if notches > 0.0 {
            let distance = log_max - pos;
            if distance < margin {
                let t = 1.0 - distance / margin;
                return notches * (1.0 - t * t);
            }
        } else if self.min_zoom > 1.0 {
            let distance = pos - log_min;
            if distance < margin {
                let t = 1.0 - distance / margin;
                return notches * (1.0 - t * t);
            }
        }
        notches
    }

    /// Apply one frame's accumulated raw wheel delta. Sets current and
    /// target together; scroll zoom is immediate, not animated.
    pub fn apply_scroll_delta(&mut self, accumulated_delta: i32) {
        if accumulated_delta == 0 {
            return;
        }
        let notches = self.attenuated_notches(accumulated_delta as f32 / WHEEL_NOTCH);
        let zoom = self.clamp_snap(self.current * NOTCH_RATIO.powf(notches));
        self.current = zoom;
        self.target = zoom;
        self.mode = ZoomMode::Scrolling;
        if self.toggled {
            // The user picked a new level mid-peek; releasing should
            // return here, not to the pre-peek level.
            self.saved_for_toggle = zoom;
        }
    }

    /// Keyboard zoom step: multiplicative, animated. `direction` is +1 for
    /// in, -1 for out.
    pub fn apply_keyboard_step(&mut self, direction: i32) {
        let factor = (1.0 + self.keyboard_step).powi(direction);
        let new_target = self.clamp_snap(self.target * factor);
        if (new_target - self.target).abs() < SNAP_EPSILON {
            return;
        }
        self.target = new_target;
        self.mode = ZoomMode::Animating;
        if self.toggled {
            self.saved_for_toggle = new_target;
        }
    }

    /// Begin animating toward `zoom`.
    pub fn animate_to(&mut self, zoom: f32) {
        let z = self.clamp_snap(zoom);
        if (self.current - z).abs() < SNAP_EPSILON && (self.target - z).abs() < SNAP_EPSILON {
            return;
        }
        self.target = z;
        self.mode = ZoomMode::Animating;
    }

    /// Advance one frame. Returns whether the zoom value changed.
    /// `dt_seconds` is clamped to [0, 0.1] so a debugger pause does not
    /// teleport the animation.
    pub fn tick(&mut self, dt_seconds: f32) -> bool {
        let dt = dt_seconds.clamp(0.0, 0.1);
        match self.mode {
            ZoomMode::Idle => false,
            ZoomMode::Scrolling => {
                // Value was applied directly; one frame later we are at rest.
                self.mode = ZoomMode::Idle;
                true
            }
            ZoomMode::Animating => {
                let alpha = 1.0 - (1.0 - self.ease_rate).powf(dt * 60.0);
                self.current += (self.target - self.current) * alpha;
                if (self.current - self.target).abs() < SNAP_EPSILON {
                    self.current = self.target;
                    self.mode = ZoomMode::Idle;
                }
                true
            }
        }
    }

    /// Hold-to-peek: remember where we are and animate to the "other side"
    /// (unzoomed if zoomed, the last used level if at 1.0). Idempotent while
    /// engaged.
    pub fn engage_toggle(&mut self) {
        if self.toggled {
            return;
        }
        self.saved_for_toggle = self.current;
        if (self.current - 1.0).abs() < SNAP_EPSILON {
            self.animate_to(self.last_used_zoom);
        } else {
            self.last_used_zoom = self.current;
            self.animate_to(1.0);
        }
        self.toggled = true;
    }

    pub fn release_toggle(&mut self) {
        if !self.toggled {
            return;
        }
        self.animate_to(self.saved_for_toggle);
        self.toggled = false;
    }

    /// One-shot permanent switch (tray menu): same flip as `engage_toggle`
    /// but with no release expected.
    pub fn tray_toggle(&mut self) {
        if (self.current - 1.0).abs() < SNAP_EPSILON {
            self.animate_to(self.last_used_zoom);
        } else {
            self.last_used_zoom = self.current;
            self.animate_to(1.0);
        }
    }

    /// Adopt a new settings generation. Pulls the current level back inside
    /// the new bounds by animation rather than a jump.
    pub fn apply_settings(
        &mut self,
        min_zoom: f32,
        max_zoom: f32,
        keyboard_step: f32,
        default_zoom_level: f32,
        speed: AnimationSpeed,
    ) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.keyboard_step = keyboard_step;
        self.ease_rate = speed.ease_rate();
        self.last_used_zoom = default_zoom_level;
        self.target = self.target.clamp(min_zoom, max_zoom);
        if self.current > max_zoom {
            self.animate_to(max_zoom);
        } else if self.current < min_zoom {
            self.animate_to(min_zoom);
        }
    }

    /// Instantly force 1.0. Shutdown path only.
    pub fn reset(&mut self) {
        self.current = 1.0;
        self.target = 1.0;
        self.mode = ZoomMode::Idle;
        self.toggled = false;
    }
}
