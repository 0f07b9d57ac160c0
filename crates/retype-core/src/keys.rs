//! Key input and keystroke classification.
//!
//! Platform-agnostic key representation. Platform-specific code converts
//! native key events into [`KeyInput`]; the session then classifies each one
//! with [`KeyBindings::classify`] and folds it into an [`Action`].

use smol_str::SmolStr;

/// Key values for keyboard input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    // === Whitespace / editing ===
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,

    // === Modifiers ===
    Alt,
    AltGraph,
    CapsLock,
    Control,
    Meta,
    Shift,

    /// Any other named key (function keys, media keys, IME keys, ...).
    Named(SmolStr),
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Parse a W3C `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" => Self::Escape,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Alt" => Self::Alt,
            "AltGraph" => Self::AltGraph,
            "CapsLock" => Self::CapsLock,
            "Control" => Self::Control,
            "Meta" => Self::Meta,
            "Shift" => Self::Shift,
            "" | "Unidentified" => Self::Unidentified,
            other if other.chars().count() == 1 => Self::character(other),
            other => Self::Named(other.into()),
        }
    }

    /// Check if this is an arrow key.
    pub fn is_arrow(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft | Self::ArrowRight | Self::ArrowUp | Self::ArrowDown
        )
    }

    /// Whether this is the character key `c`, case-insensitively.
    fn is_char(&self, c: char) -> bool {
        match self {
            Self::Character(s) => {
                let mut chars = s.chars();
                matches!((chars.next(), chars.next()), (Some(k), None) if k.eq_ignore_ascii_case(&c))
            }
            _ => false,
        }
    }
}

/// Modifier key state for a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META_SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: true,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    /// Whether the platform's primary modifier is held.
    pub fn has_primary(&self, is_mac: bool) -> bool {
        if is_mac { self.meta } else { self.ctrl }
    }
}

/// A single key press.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A plain character key press.
    pub fn char(c: char) -> Self {
        Self::new(Key::Character(c.to_string().into()))
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary(is_mac),
        }
    }
}

/// How a key press is treated by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Focus navigation; never intercepted.
    Ignored,
    Undo,
    Redo,
    Delete,
    Paste,
    Arrow,
    /// Anything else; only counts as an edit if content changed.
    Other,
}

impl KeyClass {
    /// Whether the browser default must be suppressed at key-down time.
    pub fn suppresses_default(self) -> bool {
        matches!(self, Self::Undo | Self::Redo)
    }
}

/// Classification of the most recent edit, used to coalesce history steps.
///
/// Consecutive keystrokes with the same action collapse into one undo step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    None,
    Delete,
    /// Carries a per-session stamp so every paste is its own step.
    Paste(u64),
    Arrow,
    Back,
}

/// Shortcut configuration for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    /// Use Cmd instead of Ctrl as the primary modifier.
    pub mac: bool,
    /// Key that undoes together with the primary modifier (Shift redoes).
    pub undo_key: char,
    /// Key that pastes together with the primary modifier.
    pub paste_key: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mac: false,
            undo_key: 'z',
            paste_key: 'v',
        }
    }
}

impl KeyBindings {
    pub fn for_platform(mac: bool) -> Self {
        Self {
            mac,
            ..Self::default()
        }
    }

    pub fn classify(&self, input: &KeyInput) -> KeyClass {
        let primary = input.modifiers.has_primary(self.mac);
        match &input.key {
            Key::Tab => KeyClass::Ignored,
            key if primary && key.is_char(self.undo_key) => {
                if input.modifiers.shift {
                    KeyClass::Redo
                } else {
                    KeyClass::Undo
                }
            }
            key if primary && key.is_char(self.paste_key) => KeyClass::Paste,
            Key::Backspace => KeyClass::Delete,
            key if key.is_arrow() => KeyClass::Arrow,
            _ => KeyClass::Other,
        }
    }
}

/// Result of handling a key-down event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Not intercepted; nothing was scheduled.
    Ignored,
    /// Let the platform apply the key, then settle on a later turn.
    Deferred,
    /// Prevent the platform default now, then settle on a later turn.
    Handled,
}

impl KeydownResult {
    pub fn prevent_default(self) -> bool {
        matches!(self, Self::Handled)
    }

    pub fn needs_settle(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}
