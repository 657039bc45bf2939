//! Bridge to the host's fullscreen magnification surface.
//!
//! This is the only module that talks to the Magnification API; everything
//! the render thread needs goes through the [`Compositor`] trait so tests
//! can substitute a recording double. The surface has thread affinity: all
//! calls, `init` through `shutdown`, must come from the render thread.

/// Below `1 + ε` the input transform is disabled instead of configured.
pub const IDENTITY_EPSILON: f32 = 0.001;

pub trait Compositor: Send {
    fn init(&mut self) -> bool;

    /// Reset the transform to identity, then release the surface.
    fn shutdown(&mut self);

    fn set_transform(&mut self, magnification: f32, x_offset: f32, y_offset: f32) -> bool;

    /// Keep input coordinates accurate while zoomed. At identity the
    /// transform is disabled; otherwise the source rectangle is the visible
    /// portion of the desktop and the destination is the full screen.
    fn set_input_transform(&mut self, magnification: f32, x_offset: f32, y_offset: f32) -> bool;

    /// Current transform, used for startup conflict detection.
    fn get_transform(&mut self) -> Option<(f32, f32, f32)>;

    fn set_color_inversion(&mut self, enabled: bool) -> bool;

    /// Block until the next display refresh.
    fn wait_vsync(&mut self);
}

#[cfg(windows)]
pub use windows_backend::MagnifierBridge;

#[cfg(windows)]
mod windows_backend {
    use super::{Compositor, IDENTITY_EPSILON};
    use windows::Win32::Foundation::RECT;
    use windows::Win32::Graphics::Dwm::DwmFlush;
    use windows::Win32::UI::Magnification::{
        MagGetFullscreenTransform, MagInitialize, MagSetFullscreenColorEffect,
        MagSetFullscreenTransform, MagSetInputTransform, MagShowSystemCursor, MagUninitialize,
        MAGCOLOREFFECT,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN,
    };

    /// Color matrix flipping RGB and leaving alpha alone.
    const INVERSION_EFFECT: MAGCOLOREFFECT = MAGCOLOREFFECT {
        transform: [
            -1.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0, //
            1.0, 1.0, 1.0, 0.0, 1.0,
        ],
    };

    const IDENTITY_EFFECT: MAGCOLOREFFECT = MAGCOLOREFFECT {
        transform: [
            1.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 0.0, 1.0,
        ],
    };

    #[derive(Default)]
    pub struct MagnifierBridge {
        initialized: bool,
        screen_w: i32,
        screen_h: i32,
    }

    impl MagnifierBridge {
        pub fn new() -> Self {
            Self::default()
        }

        fn full_screen_rect(&self) -> RECT {
            RECT {
                left: 0,
                top: 0,
                right: self.screen_w,
                bottom: self.screen_h,
            }
        }
    }

    impl Compositor for MagnifierBridge {
        fn init(&mut self) -> bool {
            if self.initialized {
                return true;
            }
            self.screen_w = unsafe { GetSystemMetrics(SM_CXSCREEN) };
            self.screen_h = unsafe { GetSystemMetrics(SM_CYSCREEN) };
            if !unsafe { MagInitialize() }.as_bool() {
                tracing::error!("MagInitialize failed");
                return false;
            }
            // Keep the cursor visible while magnified.
            unsafe {
                let _ = MagShowSystemCursor(true.into());
            }
            self.initialized = true;
            true
        }

        fn shutdown(&mut self) {
            if !self.initialized {
                return;
            }
            unsafe {
                let _ = MagSetFullscreenTransform(1.0, 0, 0);
                let full = self.full_screen_rect();
                let _ = MagSetInputTransform(false.into(), &full, &full);
                let _ = MagUninitialize();
            }
            self.initialized = false;
        }

        fn set_transform(&mut self, magnification: f32, x_offset: f32, y_offset: f32) -> bool {
            if !self.initialized {
                return false;
            }
            unsafe {
                MagSetFullscreenTransform(magnification, x_offset as i32, y_offset as i32)
                    .as_bool()
            }
        }

        fn set_input_transform(
            &mut self,
            magnification: f32,
            x_offset: f32,
            y_offset: f32,
        ) -> bool {
            if !self.initialized {
                return false;
            }
            let full = self.full_screen_rect();
            if magnification <= 1.0 + IDENTITY_EPSILON {
                return unsafe { MagSetInputTransform(false.into(), &full, &full) }.as_bool();
            }
            let view_w = self.screen_w as f32 / magnification;
            let view_h = self.screen_h as f32 / magnification;
            let source = RECT {
                left: x_offset as i32,
                top: y_offset as i32,
                right: (x_offset + view_w) as i32,
                bottom: (y_offset + view_h) as i32,
            };
            unsafe { MagSetInputTransform(true.into(), &source, &full) }.as_bool()
        }

        fn get_transform(&mut self) -> Option<(f32, f32, f32)> {
            if !self.initialized {
                return None;
            }
            let mut mag = 1.0f32;
            let mut x = 0i32;
            let mut y = 0i32;
            if unsafe { MagGetFullscreenTransform(&mut mag, &mut x, &mut y) }.as_bool() {
                Some((mag, x as f32, y as f32))
            } else {
                None
            }
        }

        fn set_color_inversion(&mut self, enabled: bool) -> bool {
            if !self.initialized {
                return false;
            }
            let effect = if enabled {
                &INVERSION_EFFECT
            } else {
                &IDENTITY_EFFECT
            };
            unsafe { MagSetFullscreenColorEffect(effect) }.as_bool()
        }

        fn wait_vsync(&mut self) {
            if unsafe { DwmFlush() }.is_err() {
                // Composition is off (remote session, safe mode); fall back
                // to a 60 Hz sleep so the loop keeps pacing.
                std::thread::sleep(std::time::Duration::from_millis(16));
            }
        }
    }
}

#[cfg(not(windows))]
pub use stub_backend::MagnifierBridge;

#[cfg(not(windows))]
mod stub_backend {
    use super::Compositor;

    /// Placeholder for platforms without a fullscreen magnification surface.
    #[derive(Default)]
    pub struct MagnifierBridge;

    impl MagnifierBridge {
        pub fn new() -> Self {
            Self
        }
    }

    impl Compositor for MagnifierBridge {
        fn init(&mut self) -> bool {
            false
        }

        fn shutdown(&mut self) {}

        fn set_transform(&mut self, _m: f32, _x: f32, _y: f32) -> bool {
            false
        }

        fn set_input_transform(&mut self, _m: f32, _x: f32, _y: f32) -> bool {
            false
        }

        fn get_transform(&mut self) -> Option<(f32, f32, f32)> {
            None
        }

        fn set_color_inversion(&mut self, _enabled: bool) -> bool {
            false
        }

        fn wait_vsync(&mut self) {
            std::thread::sleep(std::time::Duration::from_millis(16));
        }
    }
}

/// Test double capturing every call. Lives here rather than in a test
/// module so integration tests can drive the render path with it.
#[derive(Default)]
pub struct RecordingCompositor {
    pub initialized: bool,
    pub transforms: Vec<(f32, f32, f32)>,
    pub input_transforms: Vec<(f32, f32, f32)>,
    pub inversion_calls: Vec<bool>,
    pub vsync_waits: usize,
    pub shutdowns: usize,
    /// When set, `set_transform` reports failure (transition diagnostics).
    pub fail_transforms: bool,
}

impl RecordingCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_transform(&self) -> Option<(f32, f32, f32)> {
        self.transforms.last().copied()
    }
}

impl Compositor for RecordingCompositor {
    fn init(&mut self) -> bool {
        self.initialized = true;
        true
    }

    fn shutdown(&mut self) {
        self.shutdowns += 1;
        self.initialized = false;
    }

    fn set_transform(&mut self, magnification: f32, x_offset: f32, y_offset: f32) -> bool {
        if self.fail_transforms {
            return false;
        }
        self.transforms.push((magnification, x_offset, y_offset));
        true
    }

    fn set_input_transform(&mut self, magnification: f32, x_offset: f32, y_offset: f32) -> bool {
        if self.fail_transforms {
            return false;
        }
        self.input_transforms
            .push((magnification, x_offset, y_offset));
        true
    }

    fn get_transform(&mut self) -> Option<(f32, f32, f32)> {
        self.last_transform()
    }

    fn set_color_inversion(&mut self, enabled: bool) -> bool {
        self.inversion_calls.push(enabled);
        true
    }

    fn wait_vsync(&mut self) {
        self.vsync_waits += 1;
    }
}
