use std::sync::atomic::Ordering;
use std::sync::Arc;
use zoomwheel::common::state::SharedState;
use zoomwheel::common::{ScreenRect, TrackingSource, ZoomCommand};
use zoomwheel::compositor::RecordingCompositor;
use zoomwheel::render::frame::{frame_tick, FrameState};
use zoomwheel::render::zoom::ZoomController;
use zoomwheel::settings::SettingsSnapshot;
use zoomwheel::tracking::{caret, focus};

const DT: f32 = 1.0 / 60.0;

struct Rig {
    shared: Arc<SharedState>,
    zoom: ZoomController,
    frame: FrameState,
    compositor: RecordingCompositor,
    now_ms: i64,
}

impl Rig {
    fn new() -> Self {
        let shared = SharedState::new(SettingsSnapshot::default());
        shared.screen_width.store(1920, Ordering::Relaxed);
        shared.screen_height.store(1080, Ordering::Relaxed);
        Self {
            shared,
            zoom: ZoomController::new(),
            frame: FrameState::new(),
            compositor: RecordingCompositor::new(),
            now_ms: 10_000,
        }
    }

    fn tick(&mut self, pointer: (i32, i32)) {
        frame_tick(
            &self.shared,
            &mut self.zoom,
            &mut self.frame,
            &mut self.compositor,
            Some(pointer),
            self.now_ms,
            DT,
        );
        self.now_ms += (DT * 1000.0) as i64;
    }

    fn tick_many(&mut self, pointer: (i32, i32), frames: usize) {
        for _ in 0..frames {
            self.tick(pointer);
        }
    }
}

// Scenario: three notches in, three notches out, all through shared state.
#[test]
fn scroll_pipeline_zooms_in_and_back_out() {
    let mut rig = Rig::new();
    let pointer = (960, 540);

    rig.shared.scroll_accumulator.fetch_add(360, Ordering::Release);
    rig.tick(pointer);

    let (mag, x, y) = rig.compositor.last_transform().unwrap();
    assert!((mag - 1.331).abs() < 1e-3);
    let expected_x = 960.0 * (1.0 - 1.0 / mag);
    let expected_y = 540.0 * (1.0 - 1.0 / mag);
    assert!((x - expected_x).abs() < 0.5);
    assert!((y - expected_y).abs() < 0.5);

    rig.shared.scroll_accumulator.fetch_add(-360, Ordering::Release);
    rig.tick(pointer);

    let (mag, x, y) = rig.compositor.last_transform().unwrap();
    assert_eq!(mag, 1.0);
    assert_eq!((x, y), (0.0, 0.0));
}

#[test]
fn scroll_accumulator_is_drained_by_the_tick() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(240, Ordering::Release);
    rig.tick((960, 540));
    assert_eq!(rig.shared.scroll_accumulator.load(Ordering::Acquire), 0);
}

#[test]
fn both_transforms_always_carry_the_same_tuple() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(360, Ordering::Release);
    rig.tick((960, 540));
    rig.shared.commands.push(ZoomCommand::ZoomIn);
    rig.tick_many((960, 540), 30);

    assert!(!rig.compositor.transforms.is_empty());
    assert_eq!(rig.compositor.transforms, rig.compositor.input_transforms);
}

#[test]
fn unchanged_frames_publish_nothing() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(120, Ordering::Release);
    rig.tick((960, 540));
    let published = rig.compositor.transforms.len();

    rig.tick_many((960, 540), 5);
    assert_eq!(rig.compositor.transforms.len(), published);
}

#[test]
fn zoom_level_is_published_for_other_actors() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(120, Ordering::Release);
    rig.tick((960, 540));
    assert!((rig.shared.zoom_level() - 1.1).abs() < 1e-4);
}

#[test]
fn keyboard_commands_dispatch_through_the_ring() {
    let mut rig = Rig::new();
    rig.shared.commands.push(ZoomCommand::ZoomIn);
    rig.tick_many((960, 540), 120);
    assert!((rig.zoom.current_zoom() - 1.25).abs() <= 0.005);

    rig.shared.commands.push(ZoomCommand::ResetZoom);
    rig.tick_many((960, 540), 240);
    assert_eq!(rig.zoom.current_zoom(), 1.0);
}

#[test]
fn invert_command_toggles_the_compositor_effect() {
    let mut rig = Rig::new();
    rig.shared.commands.push(ZoomCommand::ToggleInvert);
    rig.tick((960, 540));
    rig.shared.commands.push(ZoomCommand::ToggleInvert);
    rig.tick((960, 540));
    assert_eq!(rig.compositor.inversion_calls, vec![true, false]);
}

#[test]
fn settings_hot_reload_reaches_the_zoom_controller() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(2_640, Ordering::Release);
    rig.tick((960, 540));
    assert!(rig.zoom.current_zoom() > 5.0);

    let mut snap = SettingsSnapshot::default();
    snap.max_zoom = 5.0;
    rig.shared.publish_settings(snap);
    rig.tick_many((960, 540), 300);
    assert!((rig.zoom.current_zoom() - 5.0).abs() <= 0.005);
}

#[test]
fn settings_flip_of_color_inversion_commands_the_compositor() {
    let mut rig = Rig::new();
    rig.tick((960, 540));
    assert!(rig.compositor.inversion_calls.is_empty());

    let mut snap = SettingsSnapshot::default();
    snap.color_inversion_enabled = true;
    rig.shared.publish_settings(snap);
    rig.tick((960, 540));
    assert_eq!(rig.compositor.inversion_calls, vec![true]);
}

#[test]
fn deadzone_swallows_micro_jitter() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(360, Ordering::Release);
    rig.tick((960, 540));
    let committed = rig.frame.committed_pointer();

    // Two pixels on a 1080-high screen is inside the deadzone.
    rig.tick((962, 540));
    assert_eq!(rig.frame.committed_pointer(), committed);

    rig.tick((980, 540));
    assert_eq!(rig.frame.committed_pointer().x, 980);
}

#[test]
fn caret_wins_while_typing_and_transition_is_smoothed() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(360, Ordering::Release);
    rig.tick_many((960, 540), 30);
    assert_eq!(rig.frame.active_source(), TrackingSource::Pointer);
    let (_, pointer_x, _) = rig.compositor.last_transform().unwrap();

    // A caret appears and the keyboard was just touched. Positioned so the
    // lookahead target stays clear of the clamp range.
    assert!(caret::publish_caret_rect(
        &rig.shared,
        ScreenRect::new(900, 200, 902, 220)
    ));
    rig.shared
        .last_keyboard_time
        .store(rig.now_ms - 100, Ordering::Relaxed);

    rig.tick((960, 540));
    assert_eq!(rig.frame.active_source(), TrackingSource::Caret);
    // First transition frame still renders from the old offset.
    let (_, x_start, _) = rig.compositor.last_transform().unwrap();
    assert!((x_start - pointer_x).abs() < 1.0);

    // Keep the typing recent so the caret holds priority while the
    // transition plays out.
    for _ in 0..30 {
        rig.shared
            .last_keyboard_time
            .store(rig.now_ms, Ordering::Relaxed);
        rig.tick((960, 540));
    }
    let (_, x_end, _) = rig.compositor.last_transform().unwrap();
    let zoom = rig.zoom.current_zoom();
    let viewport_w = 1920.0 / zoom;
    let expected = 901.0 - viewport_w / 2.0 + 0.15 * viewport_w;
    assert!(
        (x_end - expected).abs() < 1.0,
        "expected {expected}, got {x_end}"
    );
}

#[test]
fn focus_rect_is_used_only_after_the_debounce() {
    let mut rig = Rig::new();
    rig.shared.scroll_accumulator.fetch_add(360, Ordering::Release);
    rig.tick_many((960, 540), 3);

    assert!(focus::publish_focus_rect(
        &rig.shared,
        ScreenRect::new(600, 400, 800, 500)
    ));
    // publish_focus_rect stamps the wall clock the actors share; overwrite
    // with rig time to control the debounce precisely.
    rig.shared
        .last_focus_change_time
        .store(rig.now_ms, Ordering::Release);

    rig.tick((960, 540));
    assert_eq!(rig.frame.active_source(), TrackingSource::Pointer);

    rig.tick_many((960, 540), 8);
    assert_eq!(rig.frame.active_source(), TrackingSource::Focus);
}

#[test]
fn invalid_rects_never_reach_shared_state() {
    let rig = Rig::new();
    assert!(!focus::publish_focus_rect(
        &rig.shared,
        ScreenRect::new(100, 100, 50, 200)
    ));
    assert!(!caret::publish_caret_rect(
        &rig.shared,
        ScreenRect::new(0, 0, 20_000, 10)
    ));
    assert!(!focus::publish_focus_rect(
        &rig.shared,
        ScreenRect::new(-9_000, 0, 100, 100)
    ));
    assert_eq!(rig.shared.focus_rect.read(), ScreenRect::default());
    assert_eq!(rig.shared.caret_rect.read(), ScreenRect::default());
}

#[test]
fn follow_flags_gate_the_tracking_sources() {
    let mut rig = Rig::new();
    let mut snap = SettingsSnapshot::default();
    snap.follow_text_cursor = false;
    snap.follow_keyboard_focus = false;
    rig.shared.publish_settings(snap);

    rig.shared.scroll_accumulator.fetch_add(360, Ordering::Release);
    caret::publish_caret_rect(&rig.shared, ScreenRect::new(300, 200, 302, 220));
    rig.shared
        .last_keyboard_time
        .store(10_000, Ordering::Relaxed);

    rig.tick((960, 540));
    assert_eq!(rig.frame.active_source(), TrackingSource::Pointer);
}
