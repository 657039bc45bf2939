//! Process-wide shared state: the only channel between the three actors.
//!
//! Scalars are plain atomics, rectangles go through seqlocks, commands
//! through the SPSC ring, and settings through an atomically swapped
//! immutable snapshot plus a version counter. Nothing here blocks.

use crate::common::ring::SpscRing;
use crate::common::seqlock::SeqLock;
use crate::common::{ScreenRect, ZoomCommand};
use crate::settings::SettingsSnapshot;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

pub const COMMAND_RING_CAPACITY: usize = 64;

pub struct SharedState {
    // Written by the input actor.
    pub modifier_held: AtomicBool,
    pub pointer_x: AtomicI32,
    pub pointer_y: AtomicI32,
    pub scroll_accumulator: AtomicI32,
    pub last_keyboard_time: AtomicI64,

    // Screen metrics, written by the lifecycle layer at startup and on
    // display changes; read by the render actor each frame.
    pub screen_width: AtomicI32,
    pub screen_height: AtomicI32,
    pub screen_origin_x: AtomicI32,
    pub screen_origin_y: AtomicI32,

    // Written by the accessibility actor.
    pub focus_rect: SeqLock<ScreenRect>,
    pub caret_rect: SeqLock<ScreenRect>,
    pub last_focus_change_time: AtomicI64,

    // Written by the render actor only; readable everywhere (exit poll, UI).
    current_zoom_bits: AtomicU32,

    // Input actor produces, render actor consumes. Nobody else.
    pub commands: SpscRing<ZoomCommand, COMMAND_RING_CAPACITY>,

    // Settings channel: swap the snapshot, then bump the version with
    // release ordering so a reader that sees the new version sees the
    // new snapshot.
    settings: ArcSwap<SettingsSnapshot>,
    settings_version: AtomicU64,
}

impl SharedState {
    pub fn new(settings: SettingsSnapshot) -> Arc<Self> {
        Arc::new(Self {
            modifier_held: AtomicBool::new(false),
            pointer_x: AtomicI32::new(0),
            pointer_y: AtomicI32::new(0),
            scroll_accumulator: AtomicI32::new(0),
            last_keyboard_time: AtomicI64::new(0),
            screen_width: AtomicI32::new(0),
            screen_height: AtomicI32::new(0),
            screen_origin_x: AtomicI32::new(0),
            screen_origin_y: AtomicI32::new(0),
            focus_rect: SeqLock::default(),
            caret_rect: SeqLock::default(),
            last_focus_change_time: AtomicI64::new(0),
            current_zoom_bits: AtomicU32::new(1.0f32.to_bits()),
            commands: SpscRing::new(),
            settings: ArcSwap::from_pointee(settings),
            settings_version: AtomicU64::new(1),
        })
    }

    /// Render actor only.
    pub fn store_zoom_level(&self, zoom: f32) {
        self.current_zoom_bits.store(zoom.to_bits(), Ordering::Release);
    }

    pub fn zoom_level(&self) -> f32 {
        f32::from_bits(self.current_zoom_bits.load(Ordering::Acquire))
    }

    /// Publish a new immutable settings snapshot. Readers that observe the
    /// bumped version are guaranteed to load the new snapshot.
    pub fn publish_settings(&self, snapshot: SettingsSnapshot) {
        self.settings.store(Arc::new(snapshot));
        self.settings_version.fetch_add(1, Ordering::Release);
    }

    pub fn settings_version(&self) -> u64 {
        self.settings_version.load(Ordering::Acquire)
    }

    pub fn load_settings(&self) -> Arc<SettingsSnapshot> {
        self.settings.load_full()
    }
}
