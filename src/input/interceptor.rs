//! Input actor: global low-level mouse and keyboard hooks.
//!
//! The hook callbacks are the most constrained code in the process — the
//! host silently deregisters a hook that stalls for ~300 ms, so the
//! callbacks read atomics, step the modifier machine, push to the SPSC
//! ring, and return. All decision logic lives in the pure
//! [`route_mouse_event`] / [`route_key_event`] routines on [`InputShared`];
//! the OS-facing trampolines only translate events in and side effects out.

use crate::common::state::SharedState;
use crate::common::ZoomCommand;
use crate::input::modifier::{is_win_family, same_modifier_family, vk, ModifierPhase};
use crate::settings::SettingsSnapshot;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU8, AtomicIsize, Ordering};
use std::sync::Arc;

/// Marker stamped into `dwExtraInfo` of keystrokes we synthesize, so the
/// hook ignores its own injections.
pub const CHORD_INJECT_TAG: usize = 0x5A_574C_4348;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    Wheel { delta: i16 },
    Move { x: i32, y: i32 },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    PassThrough,
    Consume,
}

/// UI-thread work a key event asked for. The trampoline posts these to the
/// event sink; tests assert on them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiRequest {
    OpenSettings,
    GracefulExit,
}

/// What the trampoline must do after routing one keyboard event. Keyboard
/// events themselves are always passed through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// Synthesize the neutral chord that keeps the shell menu closed
    /// (Win-family modifier released after a zoom interaction).
    pub synthesize_release_chord: bool,
    pub post: Option<UiRequest>,
}

/// Hook-visible state. One instance lives behind the process-wide registry;
/// everything in here is an atomic because the callbacks may not lock.
pub struct InputShared {
    state: Arc<SharedState>,
    modifier_vk: AtomicU32,
    toggle1_vk: AtomicU32,
    toggle2_vk: AtomicU32,
    modifier_phase: AtomicU8,
    toggle1_down: AtomicBool,
    toggle2_down: AtomicBool,
    toggle_engaged: AtomicBool,
    ctrl_down: AtomicBool,
    alt_down: AtomicBool,
    event_sink: AtomicIsize,
    dropped_commands: AtomicI64,
}

impl InputShared {
    pub fn new(state: Arc<SharedState>) -> Arc<Self> {
        let snap = state.load_settings();
        Arc::new(Self {
            state,
            modifier_vk: AtomicU32::new(snap.modifier_key_vk),
            toggle1_vk: AtomicU32::new(snap.toggle_key1_vk),
            toggle2_vk: AtomicU32::new(snap.toggle_key2_vk),
            modifier_phase: AtomicU8::new(ModifierPhase::Idle as u8),
            toggle1_down: AtomicBool::new(false),
            toggle2_down: AtomicBool::new(false),
            toggle_engaged: AtomicBool::new(false),
            ctrl_down: AtomicBool::new(false),
            alt_down: AtomicBool::new(false),
            event_sink: AtomicIsize::new(0),
            dropped_commands: AtomicI64::new(0),
        })
    }

    /// Adopt the configurable key codes from a new settings generation.
    /// Called from the settings observer on the main thread.
    pub fn adopt_settings(&self, snap: &SettingsSnapshot) {
        self.modifier_vk.store(snap.modifier_key_vk, Ordering::Relaxed);
        self.toggle1_vk.store(snap.toggle_key1_vk, Ordering::Relaxed);
        self.toggle2_vk.store(snap.toggle_key2_vk, Ordering::Relaxed);
    }

    pub fn set_event_sink(&self, handle: isize) {
        self.event_sink.store(handle, Ordering::Release);
    }

    pub fn event_sink(&self) -> isize {
        self.event_sink.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> ModifierPhase {
        ModifierPhase::from_u8(self.modifier_phase.load(Ordering::Relaxed))
    }

    fn set_phase(&self, phase: ModifierPhase) {
        self.modifier_phase.store(phase as u8, Ordering::Relaxed);
    }

    fn mark_used(&self) {
        if self.phase() == ModifierPhase::HeldClean {
            self.set_phase(ModifierPhase::HeldUsed);
        }
    }

    fn push_command(&self, cmd: ZoomCommand) {
        // A full ring means the command is lost; count it so the watchdog
        // can surface a diagnostic outside the callback.
        if !self.state.commands.push(cmd) {
            self.dropped_commands.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Commands dropped on a full ring since the last call.
    pub fn take_dropped_commands(&self) -> i64 {
        self.dropped_commands.swap(0, Ordering::Relaxed)
    }
}

/// Route one mouse event. Returns whether the event must be swallowed
/// before it reaches other hooks and applications.
pub fn route_mouse_event(shared: &InputShared, event: MouseEvent) -> EventDisposition {
    match event {
        MouseEvent::Wheel { delta } => {
            if shared.phase().is_held() && delta != 0 {
                shared
                    .state
                    .scroll_accumulator
                    .fetch_add(delta as i32, Ordering::Release);
                shared.mark_used();
                shared.state.modifier_held.store(true, Ordering::Relaxed);
                EventDisposition::Consume
            } else {
                EventDisposition::PassThrough
            }
        }
        MouseEvent::Move { x, y } => {
            shared.state.pointer_x.store(x, Ordering::Relaxed);
            shared.state.pointer_y.store(y, Ordering::Relaxed);
            EventDisposition::PassThrough
        }
        MouseEvent::Other => EventDisposition::PassThrough,
    }
}

/// Route one keyboard event. Observe-only: the caller always passes the
/// event through, whatever the outcome says.
pub fn route_key_event(
    shared: &InputShared,
    vk_code: u32,
    direction: KeyDirection,
    now_ms: i64,
) -> KeyOutcome {
    let mut outcome = KeyOutcome::default();
    let down = direction == KeyDirection::Down;

    // Chord state is tracked from the observed stream rather than queried
    // from the OS, so the routing stays pure.
    if same_modifier_family(vk_code, vk::CONTROL) {
        shared.ctrl_down.store(down, Ordering::Relaxed);
    }
    if same_modifier_family(vk_code, vk::MENU) {
        shared.alt_down.store(down, Ordering::Relaxed);
    }

    let modifier_vk = shared.modifier_vk.load(Ordering::Relaxed);
    if same_modifier_family(vk_code, modifier_vk) {
        match direction {
            KeyDirection::Down => {
                if shared.phase() == ModifierPhase::Idle {
                    shared.set_phase(ModifierPhase::HeldClean);
                }
            }
            KeyDirection::Up => {
                let was_used = shared.phase() == ModifierPhase::HeldUsed;
                shared.set_phase(ModifierPhase::Idle);
                shared.state.modifier_held.store(false, Ordering::Relaxed);
                if was_used && is_win_family(modifier_vk) {
                    outcome.synthesize_release_chord = true;
                }
            }
        }
    }

    if down {
        shared.state.last_keyboard_time.store(now_ms, Ordering::Relaxed);

        if shared.phase().is_held() {
            let ctrl = shared.ctrl_down.load(Ordering::Relaxed);
            let alt = shared.alt_down.load(Ordering::Relaxed);
            match vk_code {
                vk::OEM_PLUS | vk::ADD => {
                    shared.push_command(ZoomCommand::ZoomIn);
                    shared.mark_used();
                }
                vk::OEM_MINUS | vk::SUBTRACT => {
                    shared.push_command(ZoomCommand::ZoomOut);
                    shared.mark_used();
                }
                vk::ESCAPE => {
                    shared.push_command(ZoomCommand::ResetZoom);
                    shared.mark_used();
                }
                vk::KEY_M if ctrl => {
                    outcome.post = Some(UiRequest::OpenSettings);
                    shared.mark_used();
                }
                vk::KEY_Q if ctrl => {
                    outcome.post = Some(UiRequest::GracefulExit);
                    shared.mark_used();
                }
                vk::KEY_I if ctrl && alt => {
                    shared.push_command(ZoomCommand::ToggleInvert);
                    shared.mark_used();
                }
                _ => {}
            }
        }
    }

    // Hold-to-peek toggle pair, tracked independently of the zoom modifier.
    if same_modifier_family(vk_code, shared.toggle1_vk.load(Ordering::Relaxed)) {
        shared.toggle1_down.store(down, Ordering::Relaxed);
    }
    if same_modifier_family(vk_code, shared.toggle2_vk.load(Ordering::Relaxed)) {
        shared.toggle2_down.store(down, Ordering::Relaxed);
    }
    let both_down = shared.toggle1_down.load(Ordering::Relaxed)
        && shared.toggle2_down.load(Ordering::Relaxed);
    if both_down {
        if !shared.toggle_engaged.swap(true, Ordering::Relaxed) {
            shared.push_command(ZoomCommand::ToggleEngage);
        }
    } else if shared.toggle_engaged.swap(false, Ordering::Relaxed) {
        shared.push_command(ZoomCommand::ToggleRelease);
    }

    outcome
}

/// Owns the OS hook registrations. `install` must be called on a thread
/// that pumps messages; the hooks stay bound to that thread.
#[derive(Default)]
pub struct InputInterceptor {
    #[cfg(windows)]
    hooks: windows_hooks::HookHandles,
    installed: bool,
}

impl InputInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(windows)]
    pub fn install(&mut self, shared: Arc<InputShared>) -> Result<()> {
        windows_hooks::set_registry(shared);
        self.hooks.install_missing()?;
        self.installed = true;
        Ok(())
    }

    #[cfg(not(windows))]
    pub fn install(&mut self, _shared: Arc<InputShared>) -> Result<()> {
        anyhow::bail!("global input hooks are not supported on this platform")
    }

    pub fn uninstall(&mut self) {
        #[cfg(windows)]
        self.hooks.uninstall();
        self.installed = false;
    }

    /// Both hooks still registered? The host silently drops a hook whose
    /// callback overruns, so this is polled by the watchdog.
    pub fn is_healthy(&self) -> bool {
        #[cfg(windows)]
        {
            self.installed && self.hooks.both_present()
        }
        #[cfg(not(windows))]
        {
            false
        }
    }

    /// Re-register whichever hooks were dropped. Returns the new health.
    pub fn reinstall(&mut self) -> bool {
        #[cfg(windows)]
        {
            if !self.installed {
                return false;
            }
            if let Err(err) = self.hooks.install_missing() {
                tracing::warn!(?err, "hook reinstall failed");
            }
            self.is_healthy()
        }
        #[cfg(not(windows))]
        {
            false
        }
    }
}

impl Drop for InputInterceptor {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(windows)]
mod windows_hooks {
    use super::*;
    use crate::common::monotonic_ms;
    use crate::input::{WM_APP_GRACEFUL_EXIT, WM_APP_OPEN_SETTINGS};
    use anyhow::{anyhow, Context};
    use once_cell::sync::OnceCell;
    use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP, VK_CONTROL,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, PostMessageW, SetWindowsHookExW, UnhookWindowsHookEx, HHOOK,
        KBDLLHOOKSTRUCT, MSLLHOOKSTRUCT, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP,
        WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    // One-shot registry: bound at install time, before the OS can invoke a
    // callback, and never re-bound afterwards.
    static REGISTRY: OnceCell<Arc<InputShared>> = OnceCell::new();

    pub(super) fn set_registry(shared: Arc<InputShared>) {
        let _ = REGISTRY.set(shared);
    }

    fn registry() -> Option<&'static Arc<InputShared>> {
        REGISTRY.get()
    }

    #[derive(Default)]
    pub(super) struct HookHandles {
        mouse: Option<HHOOK>,
        keyboard: Option<HHOOK>,
    }

    impl HookHandles {
        pub(super) fn install_missing(&mut self) -> Result<()> {
            let module = unsafe { GetModuleHandleW(None) }.context("resolve module handle")?;
            if self.mouse.is_none() {
                let hook = unsafe {
                    SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), module, 0)
                }
                .map_err(|e| anyhow!("install mouse hook: {e}"))?;
                self.mouse = Some(hook);
            }
            if self.keyboard.is_none() {
                match unsafe {
                    SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), module, 0)
                } {
                    Ok(hook) => self.keyboard = Some(hook),
                    Err(e) => {
                        if let Some(mouse) = self.mouse.take() {
                            unsafe {
                                let _ = UnhookWindowsHookEx(mouse);
                            }
                        }
                        return Err(anyhow!("install keyboard hook: {e}"));
                    }
                }
            }
            Ok(())
        }

        pub(super) fn uninstall(&mut self) {
            if let Some(hook) = self.mouse.take() {
                unsafe {
                    let _ = UnhookWindowsHookEx(hook);
                }
            }
            if let Some(hook) = self.keyboard.take() {
                unsafe {
                    let _ = UnhookWindowsHookEx(hook);
                }
            }
        }

        pub(super) fn both_present(&self) -> bool {
            self.mouse.is_some() && self.keyboard.is_some()
        }
    }

    const LLMHF_INJECTED: u32 = 0x1;
    const LLKHF_INJECTED: u32 = 0x10;

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code >= 0 {
            if let Some(shared) = registry() {
                let info = &*(l_param.0 as *const MSLLHOOKSTRUCT);
                if (info.flags & LLMHF_INJECTED) == 0 {
                    let event = match w_param.0 as u32 {
                        WM_MOUSEWHEEL => MouseEvent::Wheel {
                            delta: ((info.mouseData >> 16) & 0xFFFF) as i16,
                        },
                        WM_MOUSEMOVE => MouseEvent::Move {
                            x: info.pt.x,
                            y: info.pt.y,
                        },
                        _ => MouseEvent::Other,
                    };
                    if route_mouse_event(shared, event) == EventDisposition::Consume {
                        return LRESULT(1);
                    }
                }
            }
        }
        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code >= 0 {
            if let Some(shared) = registry() {
                let info = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
                let injected = (info.flags.0 & LLKHF_INJECTED) != 0
                    || info.dwExtraInfo == CHORD_INJECT_TAG;
                if !injected {
                    let direction = match w_param.0 as u32 {
                        WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyDirection::Down),
                        WM_KEYUP | WM_SYSKEYUP => Some(KeyDirection::Up),
                        _ => None,
                    };
                    if let Some(direction) = direction {
                        let outcome =
                            route_key_event(shared, info.vkCode, direction, monotonic_ms());
                        if outcome.synthesize_release_chord {
                            send_release_chord();
                        }
                        if let Some(request) = outcome.post {
                            post_ui_request(shared, request);
                        }
                    }
                }
            }
        }
        // Keyboard events are observe-only; never consumed.
        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }

    /// Tap Ctrl so the shell treats the Win press as part of a chord and
    /// keeps its menu closed.
    fn send_release_chord() {
        let key = |flags| INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VK_CONTROL,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: CHORD_INJECT_TAG,
                },
            },
        };
        let inputs = [key(Default::default()), key(KEYEVENTF_KEYUP)];
        unsafe {
            let _ = SendInput(&inputs, std::mem::size_of::<INPUT>() as i32);
        }
    }

    fn post_ui_request(shared: &InputShared, request: UiRequest) {
        let sink = shared.event_sink();
        if sink == 0 {
            return;
        }
        let msg = match request {
            UiRequest::OpenSettings => WM_APP_OPEN_SETTINGS,
            UiRequest::GracefulExit => WM_APP_GRACEFUL_EXIT,
        };
        unsafe {
            let _ = PostMessageW(HWND(sink as *mut _), msg, WPARAM(0), LPARAM(0));
        }
    }
}
