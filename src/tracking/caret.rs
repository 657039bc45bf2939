//! Text caret tracking by polling the GUI-thread-info query.
//!
//! This works across the widest range of applications (editors, terminals,
//! browsers) without per-app accessibility support. A poll that reports no
//! blinking caret writes nothing; the render actor's arbitration window
//! discards stale rectangles on its own.

use crate::common::state::SharedState;
use crate::common::ScreenRect;

/// Sampling seam for the host caret query.
pub trait CaretProbe: Send {
    /// Screen-coordinate caret rectangle, if a blinking caret exists.
    fn sample(&self) -> Option<ScreenRect>;

    /// Whether this probe can ever produce a sample on this host.
    fn available(&self) -> bool;
}

/// Validate-then-write step shared by the actor loop and the tests.
pub fn publish_caret_rect(shared: &SharedState, rect: ScreenRect) -> bool {
    if !rect.is_valid() {
        return false;
    }
    shared.caret_rect.write(rect);
    true
}

#[derive(Debug, Default)]
pub struct GuiThreadCaretProbe;

#[cfg(windows)]
impl CaretProbe for GuiThreadCaretProbe {
    fn sample(&self) -> Option<ScreenRect> {
        use windows::Win32::Foundation::POINT;
        use windows::Win32::Graphics::Gdi::ClientToScreen;
        use windows::Win32::UI::WindowsAndMessaging::{
            GetGUIThreadInfo, GUITHREADINFO, GUITHREADINFO_FLAGS, GUI_CARETBLINKING,
        };

        let mut info = GUITHREADINFO {
            cbSize: std::mem::size_of::<GUITHREADINFO>() as u32,
            ..Default::default()
        };
        // Thread id 0 = whichever thread owns the foreground window.
        if unsafe { GetGUIThreadInfo(0, &mut info) }.is_err() {
            return None;
        }
        if (info.flags & GUI_CARETBLINKING) == GUITHREADINFO_FLAGS(0) {
            return None;
        }
        if info.hwndCaret.0.is_null() {
            return None;
        }

        let client = ScreenRect::new(
            info.rcCaret.left,
            info.rcCaret.top,
            info.rcCaret.right,
            info.rcCaret.bottom,
        );
        if !client.is_valid() {
            return None;
        }

        let mut top_left = POINT {
            x: client.left,
            y: client.top,
        };
        let mut bottom_right = POINT {
            x: client.right,
            y: client.bottom,
        };
        unsafe {
            if !ClientToScreen(info.hwndCaret, &mut top_left).as_bool() {
                return None;
            }
            if !ClientToScreen(info.hwndCaret, &mut bottom_right).as_bool() {
                return None;
            }
        }

        Some(ScreenRect::new(
            top_left.x,
            top_left.y,
            bottom_right.x,
            bottom_right.y,
        ))
    }

    fn available(&self) -> bool {
        true
    }
}

#[cfg(not(windows))]
impl CaretProbe for GuiThreadCaretProbe {
    fn sample(&self) -> Option<ScreenRect> {
        None
    }

    fn available(&self) -> bool {
        false
    }
}
