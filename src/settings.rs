//! Settings persistence and distribution.
//!
//! The on-disk document is human-readable JSON under the platform
//! application-data directory. Loading is field-tolerant: unknown keys are
//! ignored and a key that fails validation keeps its default instead of
//! poisoning the whole document. Distribution is an immutable snapshot
//! behind an atomic swap plus a version counter, so the render thread can
//! detect changes with a single atomic load per frame.

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Virtual-key codes for the default bindings: left Win as the zoom
/// modifier, left Ctrl + left Alt as the hold-to-peek toggle pair.
pub const VK_LWIN: u32 = 0x5B;
pub const VK_LCONTROL: u32 = 0xA2;
pub const VK_LMENU: u32 = 0xA4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationSpeed {
    Slow,
    Normal,
    Fast,
}

impl AnimationSpeed {
    /// Ease-out rate constant consumed by the zoom controller.
    pub fn ease_rate(self) -> f32 {
        match self {
            AnimationSpeed::Slow => 0.08,
            AnimationSpeed::Normal => 0.15,
            AnimationSpeed::Fast => 0.25,
        }
    }
}

/// One immutable generation of configuration. Published whole; never
/// mutated after publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    pub modifier_key_vk: u32,
    pub toggle_key1_vk: u32,
    pub toggle_key2_vk: u32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub keyboard_zoom_step: f32,
    pub default_zoom_level: f32,
    pub animation_speed: AnimationSpeed,
    pub follow_keyboard_focus: bool,
    pub follow_text_cursor: bool,
    pub start_zoomed: bool,
    pub color_inversion_enabled: bool,
    /// Stored and round-tripped, but the fullscreen magnification path is
    /// bilinear-only, so this currently drives nothing.
    pub image_smoothing_enabled: bool,
    pub start_with_system: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            modifier_key_vk: VK_LWIN,
            toggle_key1_vk: VK_LCONTROL,
            toggle_key2_vk: VK_LMENU,
            min_zoom: 1.0,
            max_zoom: 10.0,
            keyboard_zoom_step: 0.25,
            default_zoom_level: 2.0,
            animation_speed: AnimationSpeed::Normal,
            follow_keyboard_focus: true,
            follow_text_cursor: true,
            start_zoomed: false,
            color_inversion_enabled: false,
            image_smoothing_enabled: true,
            start_with_system: false,
        }
    }
}

type Observer = Box<dyn Fn(&SettingsSnapshot) + Send>;

/// Owns the current snapshot and the persistence paths. Mutating entry
/// points (`load`, `apply`) run on the main thread; `snapshot()` and
/// `version()` are safe from any thread.
pub struct SettingsStore {
    current: ArcSwap<SettingsSnapshot>,
    version: AtomicU64,
    observers: Mutex<Vec<Observer>>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(SettingsSnapshot::default()),
            version: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Load settings from `path`. Returns `false` on a missing or corrupt
    /// document; the in-memory snapshot and version are left untouched so
    /// defaults (or the previous generation) stay in effect.
    pub fn load(&self, path: &Path) -> bool {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) => {
                tracing::debug!(?err, path = %path.display(), "settings file not readable");
                return false;
            }
        };
        let doc: Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(?err, path = %path.display(), "settings file is not valid JSON");
                return false;
            }
        };
        if !doc.is_object() {
            tracing::warn!(path = %path.display(), "settings document is not an object");
            return false;
        }

        let snapshot = snapshot_from_document(&doc);
        self.publish(snapshot);
        true
    }

    /// Persist the current snapshot to `path`, creating parent directories
    /// as needed.
    pub fn save(&self, path: &Path) -> bool {
        match self.try_save(path) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(?err, path = %path.display(), "failed to save settings");
                false
            }
        }
    }

    fn try_save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create settings folder {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&*self.snapshot())
            .context("serialize settings snapshot")?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))
    }

    pub fn snapshot(&self) -> Arc<SettingsSnapshot> {
        self.current.load_full()
    }

    /// Validate and publish a modified snapshot, bumping the version and
    /// notifying observers synchronously.
    pub fn apply(&self, snapshot: SettingsSnapshot) {
        self.publish(validate(snapshot));
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn add_observer<F>(&self, callback: F)
    where
        F: Fn(&SettingsSnapshot) + Send + 'static,
    {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(Box::new(callback));
        }
    }

    fn publish(&self, snapshot: SettingsSnapshot) {
        self.current.store(Arc::new(snapshot.clone()));
        self.version.fetch_add(1, Ordering::Release);
        if let Ok(observers) = self.observers.lock() {
            for observer in observers.iter() {
                observer(&snapshot);
            }
        }
    }
}

/// Canonical settings path. Only the platform application-data variable is
/// consulted.
pub fn default_config_path() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var_os("APPDATA").map(|base| PathBuf::from(base).join("ZoomWheel/config.json"))
    }
    #[cfg(not(windows))]
    {
        std::env::var_os("HOME")
            .map(|base| PathBuf::from(base).join(".config/zoomwheel/config.json"))
    }
}

/// Build a snapshot from a parsed document, field by field. Every invalid
/// field reverts to its default; cross-field rules run after the per-field
/// reads, mirroring how the document was written.
fn snapshot_from_document(doc: &Value) -> SettingsSnapshot {
    let mut s = SettingsSnapshot::default();

    read_vk(doc, "modifier_key_vk", &mut s.modifier_key_vk);
    read_vk(doc, "toggle_key1_vk", &mut s.toggle_key1_vk);
    read_vk(doc, "toggle_key2_vk", &mut s.toggle_key2_vk);

    read_f32(doc, "min_zoom", 1.0, 10.0, &mut s.min_zoom);
    read_f32(doc, "max_zoom", 1.0, 10.0, &mut s.max_zoom);
    read_f32(doc, "keyboard_zoom_step", 0.05, 1.0, &mut s.keyboard_zoom_step);

    if let Some(speed) = doc
        .get("animation_speed")
        .and_then(|v| serde_json::from_value::<AnimationSpeed>(v.clone()).ok())
    {
        s.animation_speed = speed;
    }

    read_bool(doc, "follow_keyboard_focus", &mut s.follow_keyboard_focus);
    read_bool(doc, "follow_text_cursor", &mut s.follow_text_cursor);
    read_bool(doc, "start_zoomed", &mut s.start_zoomed);
    read_bool(doc, "color_inversion_enabled", &mut s.color_inversion_enabled);
    read_bool(doc, "image_smoothing_enabled", &mut s.image_smoothing_enabled);
    read_bool(doc, "start_with_system", &mut s.start_with_system);

    // Cross-field rules: an inverted range resets both bounds, and the
    // default level must land inside the final range.
    if s.min_zoom > s.max_zoom {
        s.min_zoom = 1.0;
        s.max_zoom = 10.0;
    }
    read_f32(doc, "default_zoom_level", s.min_zoom, s.max_zoom, &mut s.default_zoom_level);
    s.default_zoom_level = s.default_zoom_level.clamp(s.min_zoom, s.max_zoom);

    s
}

/// Same cross-field rules applied to programmatic snapshots.
fn validate(mut s: SettingsSnapshot) -> SettingsSnapshot {
    if s.min_zoom > s.max_zoom {
        s.min_zoom = 1.0;
        s.max_zoom = 10.0;
    }
    s.min_zoom = s.min_zoom.clamp(1.0, 10.0);
    s.max_zoom = s.max_zoom.clamp(1.0, 10.0);
    if !(0.05..=1.0).contains(&s.keyboard_zoom_step) {
        s.keyboard_zoom_step = SettingsSnapshot::default().keyboard_zoom_step;
    }
    s.default_zoom_level = s.default_zoom_level.clamp(s.min_zoom, s.max_zoom);
    s
}

fn read_vk(doc: &Value, key: &str, target: &mut u32) {
    if let Some(v) = doc.get(key).and_then(Value::as_u64) {
        if v <= 0xFF {
            *target = v as u32;
        }
    }
}

fn read_f32(doc: &Value, key: &str, lo: f32, hi: f32, target: &mut f32) {
    if let Some(v) = doc.get(key).and_then(Value::as_f64) {
        let v = v as f32;
        if v >= lo && v <= hi {
            *target = v;
        }
    }
}

fn read_bool(doc: &Value, key: &str, target: &mut bool) {
    if let Some(v) = doc.get(key).and_then(Value::as_bool) {
        *target = v;
    }
}
