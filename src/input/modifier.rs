//! Modifier key state machine and virtual-key family matching.
//!
//! The machine tracks whether the configured modifier is held and whether
//! the current press has participated in a zoom action. A "used" Win-family
//! press gets a synthetic chord on release so the shell never opens its
//! menu; a clean press passes through untouched.

/// Virtual-key codes used by the input actor. Kept as plain constants so
/// the routing core compiles and tests on every platform.
pub mod vk {
    pub const SHIFT: u32 = 0x10;
    pub const CONTROL: u32 = 0x11;
    pub const MENU: u32 = 0x12;
    pub const ESCAPE: u32 = 0x1B;
    pub const KEY_I: u32 = 0x49;
    pub const KEY_M: u32 = 0x4D;
    pub const KEY_Q: u32 = 0x51;
    pub const LWIN: u32 = 0x5B;
    pub const RWIN: u32 = 0x5C;
    pub const ADD: u32 = 0x6B;
    pub const SUBTRACT: u32 = 0x6D;
    pub const LSHIFT: u32 = 0xA0;
    pub const RSHIFT: u32 = 0xA1;
    pub const LCONTROL: u32 = 0xA2;
    pub const RCONTROL: u32 = 0xA3;
    pub const LMENU: u32 = 0xA4;
    pub const RMENU: u32 = 0xA5;
    pub const OEM_PLUS: u32 = 0xBB;
    pub const OEM_MINUS: u32 = 0xBD;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModifierPhase {
    /// Modifier not pressed.
    Idle = 0,
    /// Pressed, no zoom action yet.
    HeldClean = 1,
    /// Pressed and used for zoom; suppress the shell menu on release.
    HeldUsed = 2,
}

impl ModifierPhase {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ModifierPhase::HeldClean,
            2 => ModifierPhase::HeldUsed,
            _ => ModifierPhase::Idle,
        }
    }

    pub fn is_held(self) -> bool {
        self != ModifierPhase::Idle
    }
}

/// True when `vk_code` is an L/R variant of the same modifier family as the
/// configured key. Non-modifier keys match only themselves.
pub fn same_modifier_family(vk_code: u32, configured: u32) -> bool {
    match configured {
        vk::CONTROL | vk::LCONTROL | vk::RCONTROL => {
            vk_code == vk::LCONTROL || vk_code == vk::RCONTROL || vk_code == vk::CONTROL
        }
        vk::MENU | vk::LMENU | vk::RMENU => {
            vk_code == vk::LMENU || vk_code == vk::RMENU || vk_code == vk::MENU
        }
        vk::SHIFT | vk::LSHIFT | vk::RSHIFT => {
            vk_code == vk::LSHIFT || vk_code == vk::RSHIFT || vk_code == vk::SHIFT
        }
        vk::LWIN | vk::RWIN => vk_code == vk::LWIN || vk_code == vk::RWIN,
        other => vk_code == other,
    }
}

/// The Win family is the only one whose bare release triggers a shell menu.
pub fn is_win_family(vk_code: u32) -> bool {
    vk_code == vk::LWIN || vk_code == vk::RWIN
}
