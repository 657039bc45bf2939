use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zoomwheel::settings::{AnimationSpeed, SettingsSnapshot, SettingsStore};

fn non_default_snapshot() -> SettingsSnapshot {
    SettingsSnapshot {
        modifier_key_vk: 0xA2, // left Ctrl
        toggle_key1_vk: 0xA0,  // left Shift
        toggle_key2_vk: 0xA4,
        min_zoom: 1.5,
        max_zoom: 6.0,
        keyboard_zoom_step: 0.5,
        default_zoom_level: 3.0,
        animation_speed: AnimationSpeed::Fast,
        follow_keyboard_focus: false,
        follow_text_cursor: false,
        start_zoomed: true,
        color_inversion_enabled: true,
        image_smoothing_enabled: false,
        start_with_system: true,
    }
}

#[test]
fn every_field_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let store = SettingsStore::new();
    store.apply(non_default_snapshot());
    assert!(store.save(&path));

    let restored = SettingsStore::new();
    assert!(restored.load(&path));
    assert_eq!(*restored.snapshot(), non_default_snapshot());
}

#[test]
fn missing_file_leaves_defaults_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new();
    assert!(!store.load(&dir.path().join("absent.json")));
    assert_eq!(*store.snapshot(), SettingsSnapshot::default());
    assert_eq!(store.version(), 0);
}

#[test]
fn corrupt_document_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not valid json at all").unwrap();

    let store = SettingsStore::new();
    store.apply(non_default_snapshot());
    let version = store.version();

    assert!(!store.load(&path));
    assert_eq!(*store.snapshot(), non_default_snapshot());
    assert_eq!(store.version(), version);
}

#[test]
fn inverted_bounds_reset_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"min_zoom": 7.0, "max_zoom": 2.0}"#).unwrap();

    let store = SettingsStore::new();
    assert!(store.load(&path));
    let snap = store.snapshot();
    assert_eq!(snap.min_zoom, 1.0);
    assert_eq!(snap.max_zoom, 10.0);
}

#[test]
fn out_of_range_fields_keep_their_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"keyboard_zoom_step": 2.5, "max_zoom": 40.0, "min_zoom": 1.25}"#,
    )
    .unwrap();

    let store = SettingsStore::new();
    assert!(store.load(&path));
    let snap = store.snapshot();
    assert_eq!(snap.keyboard_zoom_step, 0.25);
    assert_eq!(snap.max_zoom, 10.0);
    assert_eq!(snap.min_zoom, 1.25);
}

#[test]
fn unknown_fields_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"theme": "midnight", "max_zoom": 5.0, "widgets": [1, 2, 3]}"#,
    )
    .unwrap();

    let store = SettingsStore::new();
    assert!(store.load(&path));
    assert_eq!(store.snapshot().max_zoom, 5.0);
}

#[test]
fn default_level_is_clamped_into_the_final_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"max_zoom": 4.0, "default_zoom_level": 9.0}"#,
    )
    .unwrap();

    let store = SettingsStore::new();
    assert!(store.load(&path));
    assert_eq!(store.snapshot().default_zoom_level, 2.0);
}

#[test]
fn animation_speed_parses_its_lowercase_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"animation_speed": "fast"}"#).unwrap();

    let store = SettingsStore::new();
    assert!(store.load(&path));
    assert_eq!(store.snapshot().animation_speed, AnimationSpeed::Fast);
}

#[test]
fn invalid_animation_speed_keeps_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"animation_speed": "warp"}"#).unwrap();

    let store = SettingsStore::new();
    assert!(store.load(&path));
    assert_eq!(store.snapshot().animation_speed, AnimationSpeed::Normal);
}

#[test]
fn observers_run_on_apply_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"max_zoom": 5.0}"#).unwrap();

    let store = SettingsStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&calls);
    store.add_observer(move |_| {
        observed.fetch_add(1, Ordering::SeqCst);
    });

    store.apply(SettingsSnapshot::default());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(store.load(&path));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn apply_validates_programmatic_snapshots() {
    let store = SettingsStore::new();
    let mut snap = SettingsSnapshot::default();
    snap.min_zoom = 8.0;
    snap.max_zoom = 2.0;
    snap.keyboard_zoom_step = 9.0;
    snap.default_zoom_level = 20.0;
    store.apply(snap);

    let snap = store.snapshot();
    assert_eq!(snap.min_zoom, 1.0);
    assert_eq!(snap.max_zoom, 10.0);
    assert_eq!(snap.keyboard_zoom_step, 0.25);
    assert_eq!(snap.default_zoom_level, 10.0);
}
