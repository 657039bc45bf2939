//! Render actor: a dedicated thread that ticks once per display refresh and
//! owns the compositor surface for its whole lifetime (the surface has
//! thread affinity, so init, every transform, and shutdown all happen here).

pub mod frame;
pub mod viewport;
pub mod zoom;

use crate::common::monotonic_ms;
use crate::common::state::SharedState;
use crate::compositor::Compositor;
use crate::render::frame::{frame_tick, FrameState};
use crate::render::zoom::ZoomController;
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long the main thread waits for the render thread to wind down before
/// abandoning it.
pub const SHUTDOWN_BUDGET: Duration = Duration::from_secs(3);

/// Cursor sampling seam. The render thread reads the host cursor directly
/// each frame; tests substitute a scripted provider.
pub trait CursorPositionProvider: Send + Sync {
    fn cursor_position(&self) -> Option<(i32, i32)>;
}

#[derive(Debug, Default)]
pub struct SystemCursorProvider;

#[cfg(windows)]
impl CursorPositionProvider for SystemCursorProvider {
    fn cursor_position(&self) -> Option<(i32, i32)> {
        use windows::Win32::Foundation::POINT;
        use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

        let mut point = POINT { x: 0, y: 0 };
        if unsafe { GetCursorPos(&mut point).is_ok() } {
            Some((point.x, point.y))
        } else {
            None
        }
    }
}

#[cfg(not(windows))]
impl CursorPositionProvider for SystemCursorProvider {
    fn cursor_position(&self) -> Option<(i32, i32)> {
        None
    }
}

pub struct RenderLoop {
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Launch the render thread. Blocks until the thread has initialized the
    /// compositor so a failure surfaces synchronously as a startup error.
    pub fn start(
        shared: Arc<SharedState>,
        mut compositor: Box<dyn Compositor>,
        cursor: Arc<dyn CursorPositionProvider>,
    ) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = sync_channel::<bool>(1);

        let shutdown_flag = Arc::clone(&shutdown);
        let running_flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("zoomwheel-render".to_string())
            .spawn(move || {
                if !compositor.init() {
                    let _ = ready_tx.send(false);
                    return;
                }
                let _ = ready_tx.send(true);
                running_flag.store(true, Ordering::Release);

                let mut zoom = ZoomController::new();
                let mut frame = FrameState::new();
                let mut last_frame = Instant::now();

                while !shutdown_flag.load(Ordering::Acquire) {
                    let now = Instant::now();
                    let dt = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;

                    let sample = cursor.cursor_position();
                    frame_tick(
                        &shared,
                        &mut zoom,
                        &mut frame,
                        compositor.as_mut(),
                        sample,
                        monotonic_ms(),
                        dt,
                    );

                    compositor.wait_vsync();
                    pump_thread_messages();
                }

                // Wind down on this thread: identity transform, then release.
                zoom.reset();
                compositor.set_transform(1.0, 0.0, 0.0);
                compositor.set_input_transform(1.0, 0.0, 0.0);
                shared.store_zoom_level(1.0);
                compositor.shutdown();
                running_flag.store(false, Ordering::Release);
            })
            .map_err(|err| anyhow!("failed to spawn render thread: {err}"))?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(true) => Ok(Self {
                shutdown,
                running,
                handle: Some(handle),
            }),
            Ok(false) => {
                let _ = handle.join();
                Err(anyhow!("magnification surface failed to initialize"))
            }
            Err(_) => Err(anyhow!("render thread did not signal readiness")),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request shutdown and wait up to [`SHUTDOWN_BUDGET`] for the thread to
    /// reset the magnifier and exit. An unresponsive thread is abandoned
    /// rather than blocking process exit.
    pub fn stop(mut self) {
        self.request_shutdown();
        let deadline = Instant::now() + SHUTDOWN_BUDGET;
        while self.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if let Some(handle) = self.handle.take() {
            if self.is_running() {
                tracing::warn!("render thread did not stop in time; abandoning");
            } else {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(windows)]
fn pump_thread_messages() {
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    // The magnification surface delivers its internal viewport messages
    // through the owning thread's queue.
    let mut msg = MSG::default();
    while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() } {
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_thread_messages() {}
