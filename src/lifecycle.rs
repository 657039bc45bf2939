//! Startup recovery, runtime health, and shutdown sequencing.
//!
//! Covers the dirty-shutdown sentinel, the conflicting-magnifier scan, the
//! hook watchdog's edge detection, the graceful-exit zoom poll, and the
//! small shell-facing handle.

use crate::common::state::SharedState;
use crate::common::ZoomCommand;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hook health is checked on this cadence.
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(5);

/// Graceful exit: wait for the animated zoom-out to get this close to 1.0.
pub const EXIT_ZOOM_THRESHOLD: f32 = 1.005;
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

pub const SENTINEL_FILE_NAME: &str = "zoomwheel.running";

/// Startup dialog bodies. The causes listed are the ones users actually hit.
pub const HOOK_FAILURE_TEXT: &str = "Failed to install input hooks.\n\n\
This may be caused by:\n\
  - Security software blocking hook installation\n\
  - Another application holding exclusive hook access\n\n\
ZoomWheel cannot function without input hooks.";

pub const MAGNIFIER_FAILURE_TEXT: &str = "Failed to initialize the magnification surface.\n\n\
This may be caused by:\n\
  - The binary not being code-signed\n\
  - Running from an unprivileged folder\n\
  - A missing uiAccess manifest\n\
  - Another full-screen magnifier being active";

/// Zero-byte marker sitting next to the settings document while a session
/// is live. Finding it at startup means the previous session died zoomed.
pub fn sentinel_path(config_path: &Path) -> PathBuf {
    config_path.with_file_name(SENTINEL_FILE_NAME)
}

pub fn had_dirty_shutdown(sentinel: &Path) -> bool {
    sentinel.exists()
}

pub fn write_sentinel(sentinel: &Path) -> Result<()> {
    if let Some(parent) = sentinel.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create sentinel folder {}", parent.display()))?;
    }
    std::fs::write(sentinel, [])
        .with_context(|| format!("write sentinel {}", sentinel.display()))
}

/// Best effort: also called from the panic path.
pub fn remove_sentinel(sentinel: &Path) {
    if let Err(err) = std::fs::remove_file(sentinel) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(?err, "could not remove sentinel");
        }
    }
}

/// Name of another full-screen magnifier that would fight over the
/// magnification surface.
const CONFLICTING_PROCESS: &str = "magnify";

/// Scan running processes for a conflicting magnifier. Returns its name and
/// pid so the shell can offer to terminate it.
pub fn find_conflicting_magnifier() -> Option<(String, u32)> {
    let system = sysinfo::System::new_all();
    for (pid, process) in system.processes() {
        let name = process.name().to_ascii_lowercase();
        if name.starts_with(CONFLICTING_PROCESS) {
            return Some((process.name().to_string(), pid.as_u32()));
        }
    }
    None
}

/// Ask the conflicting process to exit and give it a moment to comply.
pub fn terminate_conflicting_magnifier(pid: u32) {
    let system = sysinfo::System::new_all();
    if let Some(process) = system.process(sysinfo::Pid::from_u32(pid)) {
        process.kill();
        std::thread::sleep(Duration::from_millis(500));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// Hooks were healthy and are now gone — one-shot, user-visible.
    HooksLost,
    /// Hooks came back after a failure — one-shot, user-visible.
    HooksRestored,
}

/// Edge detector behind the 5 s health timer. While the session is locked
/// the edge is deferred, not swallowed — hooks are expected to fail on the
/// secure desktop, and a failure that persists past unlock still deserves
/// its one notification.
#[derive(Debug)]
pub struct HookWatchdog {
    last_reported: bool,
}

impl Default for HookWatchdog {
    fn default() -> Self {
        Self {
            last_reported: true,
        }
    }
}

impl HookWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, healthy: bool, session_locked: bool) -> Option<WatchdogEvent> {
        if session_locked || healthy == self.last_reported {
            return None;
        }
        self.last_reported = healthy;
        if healthy {
            Some(WatchdogEvent::HooksRestored)
        } else {
            Some(WatchdogEvent::HooksLost)
        }
    }
}

/// Poll the render-published zoom level until the animated reset lands, or
/// the timeout expires. Returns whether the reset completed.
pub fn await_zoom_reset(shared: &SharedState, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if shared.zoom_level() <= EXIT_ZOOM_THRESHOLD {
            return true;
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
    shared.zoom_level() <= EXIT_ZOOM_THRESHOLD
}

/// What the core exposes to the tray / settings shell.
///
/// `post_command` and `request_exit` must be called from the main (input)
/// thread: the command ring has a single producer.
pub struct ShellHandle {
    shared: Arc<SharedState>,
}

impl ShellHandle {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    pub fn post_command(&self, cmd: ZoomCommand) {
        if !self.shared.commands.push(cmd) {
            tracing::warn!(?cmd, "command ring full; shell command dropped");
        }
    }

    pub fn zoom_level(&self) -> f32 {
        self.shared.zoom_level()
    }

    /// Kick off the animated zoom-out that precedes process exit. The
    /// caller follows up with [`await_zoom_reset`].
    pub fn request_exit(&self) {
        self.post_command(ZoomCommand::ResetZoom);
    }

    /// Invoke `callback` with the zoom level whenever it changes, from a
    /// background poll thread. Dropping the subscription stops the thread.
    pub fn subscribe_zoom<F>(&self, callback: F) -> ZoomSubscription
    where
        F: Fn(f32) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let join = std::thread::spawn(move || {
            let mut last = shared.zoom_level();
            callback(last);
            while !stop_flag.load(Ordering::Acquire) {
                let level = shared.zoom_level();
                if level != last {
                    last = level;
                    callback(level);
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        });
        ZoomSubscription {
            stop,
            join: Some(join),
        }
    }
}

pub struct ZoomSubscription {
    stop: Arc<AtomicBool>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl Drop for ZoomSubscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
