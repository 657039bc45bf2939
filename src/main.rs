//! Application entry point: wires the actors together in dependency order,
//! runs the main-thread message pump the hooks and watchdog live on, and
//! sequences startup recovery and shutdown.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use zoomwheel::common::state::SharedState;
use zoomwheel::common::ZoomCommand;
use zoomwheel::compositor::{Compositor, MagnifierBridge};
use zoomwheel::input::interceptor::{InputInterceptor, InputShared};
use zoomwheel::lifecycle::{self, HookWatchdog, ShellHandle};
use zoomwheel::render::{RenderLoop, SystemCursorProvider};
use zoomwheel::settings::{self, SettingsStore};
use zoomwheel::tracking::TrackingMonitor;

/// Everything the message pump's window procedure needs. Bound once before
/// the pump starts; the procedure has no context argument.
struct App {
    shared: Arc<SharedState>,
    input_shared: Arc<InputShared>,
    interceptor: Mutex<InputInterceptor>,
    watchdog: Mutex<HookWatchdog>,
    session_locked: AtomicBool,
    exit_started: AtomicBool,
    main_thread_id: AtomicU32,
}

static APP: once_cell::sync::OnceCell<App> = once_cell::sync::OnceCell::new();

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(?err, "startup failed");
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    zoomwheel::logging::init();

    let config_path =
        settings::default_config_path().unwrap_or_else(|| PathBuf::from("config.json"));
    let store = Arc::new(SettingsStore::new());
    if !store.load(&config_path) {
        tracing::info!(path = %config_path.display(), "no usable settings document; using defaults");
    }

    // A sentinel left behind means the previous session died while zoomed:
    // bring the magnification surface up and straight back down to force
    // the transform back to identity before anything else happens.
    let sentinel = lifecycle::sentinel_path(&config_path);
    if lifecycle::had_dirty_shutdown(&sentinel) {
        tracing::warn!("previous session did not shut down cleanly; resetting magnification");
        let mut bridge = MagnifierBridge::new();
        if bridge.init() {
            bridge.shutdown();
        }
        lifecycle::remove_sentinel(&sentinel);
    }

    if let Some((name, pid)) = lifecycle::find_conflicting_magnifier() {
        tracing::warn!(%name, pid, "conflicting full-screen magnifier detected");
        if confirm_terminate(&name) {
            lifecycle::terminate_conflicting_magnifier(pid);
        }
    }

    let shared = SharedState::new(store.snapshot().as_ref().clone());
    let input_shared = InputShared::new(Arc::clone(&shared));
    refresh_screen_metrics(&shared);

    // Later settings generations flow to the actors through shared state
    // and the input actor's key-code atomics.
    {
        let shared = Arc::clone(&shared);
        let input_shared = Arc::clone(&input_shared);
        store.add_observer(move |snap| {
            input_shared.adopt_settings(snap);
            shared.publish_settings(snap.clone());
        });
    }

    let mut interceptor = InputInterceptor::new();
    if let Err(err) = interceptor.install(Arc::clone(&input_shared)) {
        tracing::error!(?err, "input hook installation failed");
        fatal_dialog("ZoomWheel — Startup Error", lifecycle::HOOK_FAILURE_TEXT);
        return Ok(1);
    }

    let tracking = TrackingMonitor::start(Arc::clone(&shared));
    if tracking.is_none() {
        tracing::info!("focus/caret tracking unavailable; continuing with pointer tracking");
    }

    let render = match RenderLoop::start(
        Arc::clone(&shared),
        Box::new(MagnifierBridge::new()),
        Arc::new(SystemCursorProvider),
    ) {
        Ok(render) => render,
        Err(err) => {
            tracing::error!(?err, "magnification surface initialization failed");
            if let Some(tracking) = tracking {
                tracking.stop();
            }
            interceptor.uninstall();
            fatal_dialog("ZoomWheel — Magnifier Error", lifecycle::MAGNIFIER_FAILURE_TEXT);
            return Ok(1);
        }
    };

    if let Err(err) = lifecycle::write_sentinel(&sentinel) {
        tracing::warn!(?err, "could not write running sentinel");
    }
    install_panic_hook(sentinel.clone());

    let shell = ShellHandle::new(Arc::clone(&shared));
    if store.snapshot().start_zoomed {
        shell.post_command(ZoomCommand::TrayToggle);
    }

    let _ = APP.set(App {
        shared: Arc::clone(&shared),
        input_shared: Arc::clone(&input_shared),
        interceptor: Mutex::new(interceptor),
        watchdog: Mutex::new(HookWatchdog::new()),
        session_locked: AtomicBool::new(false),
        exit_started: AtomicBool::new(false),
        main_thread_id: AtomicU32::new(0),
    });

    run_message_pump(&input_shared)?;

    // Ordered teardown: tracking first, then the render thread (it resets
    // the zoom on its own thread within its 3 s budget), then the hooks.
    if let Some(tracking) = tracking {
        tracking.stop();
    }
    render.stop();
    if let Some(app) = APP.get() {
        if let Ok(mut interceptor) = app.interceptor.lock() {
            interceptor.uninstall();
        }
    }
    lifecycle::remove_sentinel(&sentinel);
    tracing::info!("clean exit");
    Ok(0)
}

fn refresh_screen_metrics(shared: &SharedState) {
    #[cfg(windows)]
    {
        use windows::Win32::UI::WindowsAndMessaging::{
            GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
            SM_YVIRTUALSCREEN,
        };
        unsafe {
            shared
                .screen_width
                .store(GetSystemMetrics(SM_CXVIRTUALSCREEN), Ordering::Relaxed);
            shared
                .screen_height
                .store(GetSystemMetrics(SM_CYVIRTUALSCREEN), Ordering::Relaxed);
            shared
                .screen_origin_x
                .store(GetSystemMetrics(SM_XVIRTUALSCREEN), Ordering::Relaxed);
            shared
                .screen_origin_y
                .store(GetSystemMetrics(SM_YVIRTUALSCREEN), Ordering::Relaxed);
        }
    }
    #[cfg(not(windows))]
    {
        shared.screen_width.store(1920, Ordering::Relaxed);
        shared.screen_height.store(1080, Ordering::Relaxed);
        shared.screen_origin_x.store(0, Ordering::Relaxed);
        shared.screen_origin_y.store(0, Ordering::Relaxed);
    }
}

/// Best effort only: drop the sentinel so the next launch knows to reset
/// stuck magnification, then let the process die.
fn install_panic_hook(sentinel: PathBuf) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        lifecycle::remove_sentinel(&sentinel);
        previous(info);
    }));
}

#[cfg(windows)]
fn fatal_dialog(title: &str, body: &str) {
    use windows::core::HSTRING;
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};
    unsafe {
        MessageBoxW(None, &HSTRING::from(body), &HSTRING::from(title), MB_OK | MB_ICONERROR);
    }
}

#[cfg(not(windows))]
fn fatal_dialog(title: &str, body: &str) {
    eprintln!("{title}\n\n{body}");
}

#[cfg(windows)]
fn confirm_terminate(name: &str) -> bool {
    use windows::core::HSTRING;
    use windows::Win32::UI::WindowsAndMessaging::{
        MessageBoxW, IDYES, MB_ICONWARNING, MB_YESNO,
    };
    let body = format!(
        "Another full-screen magnifier ({name}) is running and will conflict \
         with ZoomWheel.\n\nClose it now?"
    );
    unsafe {
        MessageBoxW(
            None,
            &HSTRING::from(body),
            &HSTRING::from("ZoomWheel — Conflicting Magnifier"),
            MB_YESNO | MB_ICONWARNING,
        ) == IDYES
    }
}

#[cfg(not(windows))]
fn confirm_terminate(_name: &str) -> bool {
    false
}

#[cfg(windows)]
fn run_message_pump(input_shared: &InputShared) -> Result<()> {
    use anyhow::Context;
    use windows::core::w;
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::RemoteDesktop::{
        WTSRegisterSessionNotification, WTSUnRegisterSessionNotification,
        NOTIFY_FOR_THIS_SESSION,
    };
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DestroyWindow, DispatchMessageW, GetMessageW, KillTimer,
        RegisterClassW, SetTimer, TranslateMessage, HWND_MESSAGE, MSG, WINDOW_EX_STYLE,
        WINDOW_STYLE, WNDCLASSW,
    };

    let instance = unsafe { GetModuleHandleW(None) }.context("resolve module handle")?;
    let class = WNDCLASSW {
        lpfnWndProc: Some(pump_wndproc),
        hInstance: instance.into(),
        lpszClassName: w!("ZoomWheelPump"),
        ..Default::default()
    };
    unsafe { RegisterClassW(&class) };

    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            w!("ZoomWheelPump"),
            w!("ZoomWheel"),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            HWND_MESSAGE,
            None,
            instance,
            None,
        )
    }
    .context("create message window")?;

    if let Some(app) = APP.get() {
        app.main_thread_id
            .store(unsafe { GetCurrentThreadId() }, Ordering::Relaxed);
    }
    input_shared.set_event_sink(hwnd.0 as isize);

    unsafe {
        let _ = WTSRegisterSessionNotification(hwnd, NOTIFY_FOR_THIS_SESSION);
        SetTimer(hwnd, WATCHDOG_TIMER_ID, lifecycle::WATCHDOG_INTERVAL.as_millis() as u32, None);
    }

    let mut msg = MSG::default();
    loop {
        let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        if status.0 <= 0 {
            break;
        }
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    input_shared.set_event_sink(0);
    unsafe {
        let _ = KillTimer(hwnd, WATCHDOG_TIMER_ID);
        let _ = WTSUnRegisterSessionNotification(hwnd);
        let _ = DestroyWindow(hwnd);
    }
    Ok(())
}

#[cfg(not(windows))]
fn run_message_pump(_input_shared: &InputShared) -> Result<()> {
    // No host pump on this platform; startup has already failed by the time
    // this could run.
    Ok(())
}

#[cfg(windows)]
const WATCHDOG_TIMER_ID: usize = 1;

#[cfg(windows)]
const WM_WTSSESSION_CHANGE: u32 = 0x02B1;
#[cfg(windows)]
const WTS_SESSION_LOCK: usize = 0x7;
#[cfg(windows)]
const WTS_SESSION_UNLOCK: usize = 0x8;

#[cfg(windows)]
unsafe extern "system" fn pump_wndproc(
    hwnd: windows::Win32::Foundation::HWND,
    msg: u32,
    wparam: windows::Win32::Foundation::WPARAM,
    lparam: windows::Win32::Foundation::LPARAM,
) -> windows::Win32::Foundation::LRESULT {
    use windows::Win32::Foundation::LRESULT;
    use windows::Win32::UI::WindowsAndMessaging::{
        DefWindowProcW, PostQuitMessage, WM_DESTROY, WM_DISPLAYCHANGE, WM_ENDSESSION, WM_TIMER,
    };
    use zoomwheel::input::{WM_APP_GRACEFUL_EXIT, WM_APP_OPEN_SETTINGS};

    match msg {
        WM_TIMER if wparam.0 == WATCHDOG_TIMER_ID => {
            run_health_check();
            LRESULT(0)
        }
        WM_WTSSESSION_CHANGE => {
            if let Some(app) = APP.get() {
                match wparam.0 {
                    WTS_SESSION_LOCK => {
                        app.session_locked.store(true, Ordering::Release);
                    }
                    WTS_SESSION_UNLOCK => {
                        app.session_locked.store(false, Ordering::Release);
                        // Hooks commonly die on the secure desktop; check
                        // right away instead of waiting out the timer.
                        run_health_check();
                    }
                    _ => {}
                }
            }
            LRESULT(0)
        }
        WM_APP_OPEN_SETTINGS => {
            // The settings window belongs to the shell; record the request.
            tracing::info!("settings window requested");
            LRESULT(0)
        }
        WM_APP_GRACEFUL_EXIT => {
            begin_graceful_exit();
            LRESULT(0)
        }
        WM_DISPLAYCHANGE => {
            if let Some(app) = APP.get() {
                refresh_screen_metrics(&app.shared);
            }
            LRESULT(0)
        }
        WM_ENDSESSION if wparam.0 != 0 => {
            // Log-off or shutdown: drop out of the pump so the ordered
            // teardown (tracking, render with its 3 s budget, hooks) runs.
            PostQuitMessage(0);
            LRESULT(0)
        }
        WM_DESTROY => {
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

#[cfg(windows)]
fn run_health_check() {
    let Some(app) = APP.get() else {
        return;
    };
    let dropped = app.input_shared.take_dropped_commands();
    if dropped > 0 {
        tracing::warn!(dropped, "command ring overflowed; commands were lost");
    }
    let healthy = match app.interceptor.lock() {
        Ok(mut interceptor) => {
            let mut healthy = interceptor.is_healthy();
            if !healthy {
                healthy = interceptor.reinstall();
            }
            healthy
        }
        Err(_) => return,
    };
    let locked = app.session_locked.load(Ordering::Acquire);
    let event = app
        .watchdog
        .lock()
        .ok()
        .and_then(|mut watchdog| watchdog.observe(healthy, locked));
    match event {
        Some(lifecycle::WatchdogEvent::HooksLost) => {
            tracing::warn!("input hooks were deregistered; reinstall pending");
        }
        Some(lifecycle::WatchdogEvent::HooksRestored) => {
            tracing::info!("input hooks restored");
        }
        None => {}
    }
}

#[cfg(windows)]
fn begin_graceful_exit() {
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};

    let Some(app) = APP.get() else {
        return;
    };
    if app.exit_started.swap(true, Ordering::AcqRel) {
        return;
    }
    // Animate back to 1.0 first, then let the pump fall out once the render
    // thread reports the level is back down (or the timeout expires).
    let _ = app.shared.commands.push(ZoomCommand::ResetZoom);
    let shared = Arc::clone(&app.shared);
    let thread_id = app.main_thread_id.load(Ordering::Relaxed);
    std::thread::spawn(move || {
        if !lifecycle::await_zoom_reset(&shared, lifecycle::EXIT_TIMEOUT) {
            tracing::warn!("zoom did not settle before exit timeout");
        }
        unsafe {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    });
}
