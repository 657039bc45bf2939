use zoomwheel::render::zoom::{ZoomController, ZoomMode};
use zoomwheel::settings::AnimationSpeed;

const FRAME_60HZ: f32 = 1.0 / 60.0;

fn settle(zc: &mut ZoomController, dt: f32, max_frames: usize) -> usize {
    for frame in 0..max_frames {
        zc.tick(dt);
        if zc.mode() == ZoomMode::Idle {
            return frame + 1;
        }
    }
    max_frames
}

#[test]
fn starts_at_unity_idle() {
    let zc = ZoomController::new();
    assert_eq!(zc.current_zoom(), 1.0);
    assert_eq!(zc.target_zoom(), 1.0);
    assert_eq!(zc.mode(), ZoomMode::Idle);
}

#[test]
fn one_notch_up_is_ten_percent() {
    let mut zc = ZoomController::new();
    zc.apply_scroll_delta(120);
    assert!((zc.current_zoom() - 1.1).abs() < 1e-4);
    assert_eq!(zc.mode(), ZoomMode::Scrolling);
}

#[test]
fn zero_delta_is_a_noop() {
    let mut zc = ZoomController::new();
    zc.apply_scroll_delta(0);
    assert_eq!(zc.current_zoom(), 1.0);
    assert_eq!(zc.mode(), ZoomMode::Idle);
}

#[test]
fn scroll_out_clamps_at_minimum() {
    let mut zc = ZoomController::new();
    zc.apply_scroll_delta(-120);
    assert_eq!(zc.current_zoom(), 1.0);
}

#[test]
fn scroll_in_saturates_at_maximum() {
    let mut zc = ZoomController::new();
    for _ in 0..200 {
        zc.apply_scroll_delta(120);
    }
    let zoom = zc.current_zoom();
    assert!(zoom <= 10.0);
    assert!(10.0 - zoom < 0.01, "soft bound should still reach the top, got {zoom}");
}

#[test]
fn sub_notch_touchpad_delta_moves_less_than_a_notch() {
    let mut zc = ZoomController::new();
    zc.apply_scroll_delta(30);
    assert!(zc.current_zoom() > 1.0);
    assert!(zc.current_zoom() < 1.1);
}

// Scenario: three notches in, three notches out, back to exactly 1.0.
#[test]
fn equal_scroll_in_and_out_returns_to_unity() {
    let mut zc = ZoomController::new();
    for _ in 0..3 {
        zc.apply_scroll_delta(120);
    }
    assert!((zc.current_zoom() - 1.331).abs() < 1e-3);
    for _ in 0..3 {
        zc.apply_scroll_delta(-120);
    }
    assert_eq!(zc.current_zoom(), 1.0, "snap must land exactly on 1.0");
}

#[test]
fn log_symmetry_away_from_bounds() {
    let mut zc = ZoomController::new();
    // Park at 2.0 first, well outside both soft-bound margins.
    zc.animate_to(2.0);
    settle(&mut zc, FRAME_60HZ, 600);
    let origin = zc.current_zoom();
    for _ in 0..5 {
        zc.apply_scroll_delta(120);
    }
    for _ in 0..5 {
        zc.apply_scroll_delta(-120);
    }
    assert!((zc.current_zoom() - origin).abs() < 0.001);
}

#[test]
fn equal_zoom_ratio_needs_equal_scroll_effort() {
    let notches_for_double = |start: f32| {
        let mut zc = ZoomController::new();
        if start > 1.0 {
            zc.animate_to(start);
            settle(&mut zc, FRAME_60HZ, 600);
        }
        let goal = zc.current_zoom() * 2.0;
        let mut notches = 0;
        while zc.current_zoom() < goal && notches < 100 {
            zc.apply_scroll_delta(120);
            notches += 1;
        }
        notches
    };
    let one_to_two = notches_for_double(1.0);
    let two_to_four = notches_for_double(2.0);
    assert!((one_to_two as i32 - two_to_four as i32).abs() <= 1);
}

#[test]
fn keyboard_step_animates_toward_target() {
    let mut zc = ZoomController::new();
    zc.apply_keyboard_step(1);
    assert!((zc.target_zoom() - 1.25).abs() < 1e-4);
    assert_eq!(zc.mode(), ZoomMode::Animating);
}

#[test]
fn keyboard_step_down_at_minimum_is_a_noop() {
    let mut zc = ZoomController::new();
    zc.apply_keyboard_step(-1);
    assert_eq!(zc.target_zoom(), 1.0);
    assert_eq!(zc.mode(), ZoomMode::Idle);
}

// Scenario: one keyboard step, sixty frames at 60 Hz.
#[test]
fn keyboard_step_converges_with_decreasing_deltas() {
    let mut zc = ZoomController::new();
    zc.apply_keyboard_step(1);

    let mut last = zc.current_zoom();
    let mut deltas = Vec::new();
    for _ in 0..60 {
        zc.tick(FRAME_60HZ);
        // The settling frame snaps the residual (< 0.005) onto the target;
        // the visible animation is every frame before it.
        if zc.mode() == ZoomMode::Animating {
            deltas.push(zc.current_zoom() - last);
        }
        last = zc.current_zoom();
    }

    assert!((zc.current_zoom() - 1.25).abs() <= 0.005);
    assert_eq!(zc.mode(), ZoomMode::Idle);
    assert!(deltas.len() > 5);
    for pair in deltas.windows(2) {
        assert!(pair[1] < pair[0], "ease-out deltas must shrink: {pair:?}");
    }
}

#[test]
fn animation_duration_is_frame_rate_independent() {
    let duration_at = |hz: f32| {
        let mut zc = ZoomController::new();
        zc.animate_to(1.25);
        let frames = settle(&mut zc, 1.0 / hz, 10_000);
        frames as f32 / hz
    };
    let at_60 = duration_at(60.0);
    let at_144 = duration_at(144.0);
    let ratio = at_60 / at_144;
    assert!(
        (0.8..=1.2).contains(&ratio),
        "60 Hz took {at_60}s, 144 Hz took {at_144}s"
    );
}

#[test]
fn dt_is_clamped_against_debugger_pauses() {
    let mut zc = ZoomController::new();
    zc.animate_to(4.0);
    // A five-second frame must not teleport the animation to the target.
    zc.tick(5.0);
    assert!(zc.current_zoom() < 4.0);
    assert!(zc.current_zoom() > 1.0);
}

#[test]
fn toggle_peeks_to_unity_and_back() {
    let mut zc = ZoomController::new();
    zc.animate_to(3.0);
    settle(&mut zc, FRAME_60HZ, 600);

    zc.engage_toggle();
    assert!(zc.is_toggled());
    settle(&mut zc, FRAME_60HZ, 600);
    assert_eq!(zc.current_zoom(), 1.0);

    // Idempotent while engaged.
    zc.engage_toggle();
    assert_eq!(zc.current_zoom(), 1.0);

    zc.release_toggle();
    assert!(!zc.is_toggled());
    settle(&mut zc, FRAME_60HZ, 600);
    assert!((zc.current_zoom() - 3.0).abs() < 0.005);
}

#[test]
fn toggle_from_unity_peeks_to_last_used_level() {
    let mut zc = ZoomController::new();
    zc.engage_toggle();
    settle(&mut zc, FRAME_60HZ, 600);
    // Default last-used level before any zooming is 2.0.
    assert!((zc.current_zoom() - 2.0).abs() < 0.005);
    zc.release_toggle();
    settle(&mut zc, FRAME_60HZ, 600);
    assert_eq!(zc.current_zoom(), 1.0);
}

#[test]
fn scrolling_during_a_peek_repoints_the_release_target() {
    let mut zc = ZoomController::new();
    zc.animate_to(3.0);
    settle(&mut zc, FRAME_60HZ, 600);
    zc.engage_toggle();
    settle(&mut zc, FRAME_60HZ, 600);

    // The user picks a new level mid-peek.
    zc.apply_scroll_delta(120);
    let picked = zc.current_zoom();

    zc.release_toggle();
    settle(&mut zc, FRAME_60HZ, 600);
    assert!((zc.current_zoom() - picked).abs() < 0.005);
}

#[test]
fn tray_toggle_flips_without_release_semantics() {
    let mut zc = ZoomController::new();
    zc.tray_toggle();
    settle(&mut zc, FRAME_60HZ, 600);
    assert!((zc.current_zoom() - 2.0).abs() < 0.005);

    zc.tray_toggle();
    settle(&mut zc, FRAME_60HZ, 600);
    assert_eq!(zc.current_zoom(), 1.0);

    // The level picked before switching off is remembered.
    zc.tray_toggle();
    settle(&mut zc, FRAME_60HZ, 600);
    assert!((zc.current_zoom() - 2.0).abs() < 0.005);
}

// Scenario: a hot-reload lowers the maximum below the current level.
#[test]
fn settings_reload_pulls_zoom_inside_new_bounds() {
    let mut zc = ZoomController::new();
    zc.animate_to(8.0);
    settle(&mut zc, FRAME_60HZ, 2_000);
    assert!((zc.current_zoom() - 8.0).abs() < 0.005);

    zc.apply_settings(1.0, 5.0, 0.25, 2.0, AnimationSpeed::Normal);
    assert_eq!(zc.mode(), ZoomMode::Animating);
    assert_eq!(zc.target_zoom(), 5.0);

    for _ in 0..60 {
        zc.tick(FRAME_60HZ);
    }
    assert!((zc.current_zoom() - 5.0).abs() <= 0.005);
}

#[test]
fn raised_minimum_gets_a_soft_approach() {
    let mut zc = ZoomController::new();
    zc.apply_settings(2.0, 10.0, 0.25, 3.0, AnimationSpeed::Normal);
    settle(&mut zc, FRAME_60HZ, 600);
    // Park just above the raised minimum, inside its soft margin.
    zc.animate_to(2.4);
    settle(&mut zc, FRAME_60HZ, 600);

    let before = zc.current_zoom();
    zc.apply_scroll_delta(-120);
    let full_notch = before / 1.1;
    // Attenuation must shorten the step compared to a free notch.
    assert!(zc.current_zoom() > full_notch);
    assert!(zc.current_zoom() >= 2.0);
}

#[test]
fn reset_is_instant() {
    let mut zc = ZoomController::new();
    zc.apply_scroll_delta(600);
    assert!(zc.current_zoom() > 1.0);
    zc.reset();
    assert_eq!(zc.current_zoom(), 1.0);
    assert_eq!(zc.target_zoom(), 1.0);
    assert_eq!(zc.mode(), ZoomMode::Idle);
}
