use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use zoomwheel::common::state::SharedState;
use zoomwheel::common::ScreenRect;
use zoomwheel::settings::SettingsSnapshot;
use zoomwheel::tracking::caret::CaretProbe;
use zoomwheel::tracking::TrackingMonitor;

struct ScriptedProbe {
    rect: ScreenRect,
    samples: Arc<AtomicI32>,
}

impl CaretProbe for ScriptedProbe {
    fn sample(&self) -> Option<ScreenRect> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        Some(self.rect)
    }

    fn available(&self) -> bool {
        true
    }
}

struct DeadProbe;

impl CaretProbe for DeadProbe {
    fn sample(&self) -> Option<ScreenRect> {
        None
    }

    fn available(&self) -> bool {
        false
    }
}

#[test]
fn polled_caret_rect_lands_in_shared_state() {
    let shared = SharedState::new(SettingsSnapshot::default());
    let samples = Arc::new(AtomicI32::new(0));
    let probe = ScriptedProbe {
        rect: ScreenRect::new(400, 300, 402, 320),
        samples: Arc::clone(&samples),
    };

    let monitor = TrackingMonitor::start_with_probe(Arc::clone(&shared), Box::new(probe))
        .expect("probe available, actor must start");

    // A few poll intervals.
    std::thread::sleep(Duration::from_millis(150));
    monitor.stop();

    assert!(samples.load(Ordering::SeqCst) >= 2);
    assert_eq!(shared.caret_rect.read(), ScreenRect::new(400, 300, 402, 320));
}

#[cfg(not(windows))]
#[test]
fn actor_declines_to_start_with_no_technique() {
    let shared = SharedState::new(SettingsSnapshot::default());
    assert!(TrackingMonitor::start_with_probe(shared, Box::new(DeadProbe)).is_none());
}

#[cfg(windows)]
#[test]
fn actor_runs_on_focus_tracking_alone() {
    // With the caret probe dead the focus hook still qualifies as a
    // technique on this platform.
    let shared = SharedState::new(SettingsSnapshot::default());
    if let Some(monitor) = TrackingMonitor::start_with_probe(shared, Box::new(DeadProbe)) {
        monitor.stop();
    }
}
