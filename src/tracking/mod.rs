//! Accessibility actor: focus and caret tracking on a dedicated thread.
//!
//! Failure anywhere in here is non-fatal — the magnifier silently degrades
//! to pointer tracking. The thread owns the focus-event hook and the caret
//! poll timer; it never touches the render actor.

pub mod caret;
pub mod focus;

use crate::common::state::SharedState;
use caret::CaretProbe;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Caret poll cadence, ~30 Hz. Comfortably ahead of human typing speed.
pub const CARET_POLL_INTERVAL: Duration = Duration::from_millis(33);

pub struct TrackingMonitor {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl TrackingMonitor {
    /// Launch the actor. Returns `None` when neither tracking technique
    /// could initialize; the caller continues with pointer tracking only.
    pub fn start(shared: Arc<SharedState>) -> Option<Self> {
        Self::start_with_probe(shared, Box::new(caret::GuiThreadCaretProbe::default()))
    }

    pub fn start_with_probe(
        shared: Arc<SharedState>,
        probe: Box<dyn CaretProbe>,
    ) -> Option<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<bool>(1);

        let join = std::thread::Builder::new()
            .name("zoomwheel-tracking".to_string())
            .spawn(move || {
                let focus_hook = focus::FocusHook::install(Arc::clone(&shared));
                let caret_ok = probe.available();
                let _ = ready_tx.send(focus_hook.is_some() || caret_ok);
                if focus_hook.is_none() && !caret_ok {
                    return;
                }

                loop {
                    focus::pump_focus_events();
                    match stop_rx.recv_timeout(CARET_POLL_INTERVAL) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    if caret_ok {
                        if let Some(rect) = probe.sample() {
                            caret::publish_caret_rect(&shared, rect);
                        }
                    }
                }

                drop(focus_hook);
            })
            .ok()?;

        match ready_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(true) => Some(Self {
                stop_tx,
                join: Some(join),
            }),
            _ => {
                tracing::debug!("no tracking technique initialized; pointer tracking only");
                let _ = join.join();
                None
            }
        }
    }

    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
