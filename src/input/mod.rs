pub mod interceptor;
pub mod modifier;

/// Application-defined window messages posted from the input actor to the
/// shell's message window.
pub const WM_APP_OPEN_SETTINGS: u32 = 0x8000 + 1;
pub const WM_APP_GRACEFUL_EXIT: u32 = 0x8000 + 2;
