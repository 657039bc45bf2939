//! Keyboard-focus tracking via the OS focus-changed event.
//!
//! Each event yields the focused element's bounding rectangle; valid ones
//! land in `focus_rect` together with a timestamp. Debouncing is a
//! render-side policy, so none happens here.

use crate::common::monotonic_ms;
use crate::common::state::SharedState;
use crate::common::ScreenRect;
use std::sync::Arc;

/// Validate-then-write step shared by the event trampoline and the tests.
/// Invalid rectangles are dropped without touching shared state.
pub fn publish_focus_rect(shared: &SharedState, rect: ScreenRect) -> bool {
    if !rect.is_valid() {
        return false;
    }
    shared.focus_rect.write(rect);
    shared
        .last_focus_change_time
        .store(monotonic_ms(), std::sync::atomic::Ordering::Release);
    true
}

#[cfg(windows)]
pub use windows_focus::{pump_focus_events, FocusHook};

#[cfg(windows)]
mod windows_focus {
    use super::*;
    use once_cell::sync::OnceCell;
    use windows::Win32::Foundation::{HWND, RECT};
    use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetWindowRect, PeekMessageW, TranslateMessage, EVENT_OBJECT_FOCUS,
        MSG, PM_REMOVE, WINEVENT_OUTOFCONTEXT, WINEVENT_SKIPOWNPROCESS,
    };

    // Bound once before the hook can fire; the event trampoline has no
    // context argument.
    static FOCUS_SINK: OnceCell<Arc<SharedState>> = OnceCell::new();

    pub struct FocusHook {
        hook: HWINEVENTHOOK,
    }

    impl FocusHook {
        /// Register for focus-changed events. The hook delivers on this
        /// thread's message queue, which the actor loop pumps.
        pub fn install(shared: Arc<SharedState>) -> Option<Self> {
            let _ = FOCUS_SINK.set(shared);
            let hook = unsafe {
                SetWinEventHook(
                    EVENT_OBJECT_FOCUS,
                    EVENT_OBJECT_FOCUS,
                    None,
                    Some(focus_event_proc),
                    0,
                    0,
                    WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
                )
            };
            if hook.is_invalid() {
                tracing::debug!("focus event hook unavailable");
                return None;
            }
            Some(Self { hook })
        }
    }

    impl Drop for FocusHook {
        fn drop(&mut self) {
            unsafe {
                let _ = UnhookWinEvent(self.hook);
            }
        }
    }

    /// Drain this thread's queue so out-of-context events get delivered.
    pub fn pump_focus_events() {
        let mut msg = MSG::default();
        while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() } {
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    unsafe extern "system" fn focus_event_proc(
        _hook: HWINEVENTHOOK,
        _event: u32,
        hwnd: HWND,
        _id_object: i32,
        _id_child: i32,
        _event_thread: u32,
        _event_time: u32,
    ) {
        if hwnd.0.is_null() {
            return;
        }
        let Some(shared) = FOCUS_SINK.get() else {
            return;
        };
        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_err() {
            return;
        }
        publish_focus_rect(
            shared,
            ScreenRect::new(rect.left, rect.top, rect.right, rect.bottom),
        );
    }
}

#[cfg(not(windows))]
pub use stub_focus::{pump_focus_events, FocusHook};

#[cfg(not(windows))]
mod stub_focus {
    use super::*;

    pub struct FocusHook;

    impl FocusHook {
        pub fn install(_shared: Arc<SharedState>) -> Option<Self> {
            None
        }
    }

    pub fn pump_focus_events() {}
}
