use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Set of held logical modifiers.
    ///
    /// Rendered in the canonical order ctrl, command, option, shift.
    #[derive(Default, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct ModifierSet: u8 {
        const CTRL    = 0b0001;
        const COMMAND = 0b0010;
        const OPTION  = 0b0100;
        const SHIFT   = 0b1000;
    }
}

impl ModifierSet {
    /// Modifiers that turn a key press into a combo. Shift alone does not:
    /// shift+letter is ordinary typing.
    pub const COMBO: Self = Self::CTRL.union(Self::COMMAND).union(Self::OPTION);

    pub fn names(&self) -> Vec<&'static str> {
        [
            (Self::CTRL, "ctrl"),
            (Self::COMMAND, "command"),
            (Self::OPTION, "option"),
            (Self::SHIFT, "shift"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }

    /// `ctrl+shift`, or an empty string for the empty set
    pub fn render(&self) -> String {
        self.names().join("+")
    }

    pub fn is_combo_context(&self) -> bool {
        self.intersects(Self::COMBO)
    }
}

impl fmt::Debug for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        write!(f, "{}", self.render())
    }
}

/// Keys without a character of their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedKey {
    Ctrl,
    CtrlRight,
    Command,
    CommandRight,
    /// Option (alt)
    Alt,
    AltRight,
    Shift,
    ShiftRight,

    Enter,
    Backspace,
    Delete,
    Tab,
    Space,

    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    CapsLock,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl NamedKey {
    /// Logical modifier this key drives, if it is a modifier key
    pub fn modifier(self) -> Option<ModifierSet> {
        match self {
            NamedKey::Ctrl | NamedKey::CtrlRight => Some(ModifierSet::CTRL),
            NamedKey::Command | NamedKey::CommandRight => Some(ModifierSet::COMMAND),
            NamedKey::Alt | NamedKey::AltRight => Some(ModifierSet::OPTION),
            NamedKey::Shift | NamedKey::ShiftRight => Some(ModifierSet::SHIFT),
            _ => None,
        }
    }

    /// Literal token appended to a typed phrase for the special typing keys
    pub fn typing_token(self) -> Option<&'static str> {
        match self {
            NamedKey::Enter => Some("\n"),
            NamedKey::Backspace => Some("<BACKSPACE>"),
            NamedKey::Delete => Some("<DELETE>"),
            NamedKey::Tab => Some("\t"),
            NamedKey::Space => Some(" "),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NamedKey::Ctrl => "ctrl",
            NamedKey::CtrlRight => "ctrl_r",
            NamedKey::Command => "command",
            NamedKey::CommandRight => "command_r",
            NamedKey::Alt => "option",
            NamedKey::AltRight => "option_r",
            NamedKey::Shift => "shift",
            NamedKey::ShiftRight => "shift_r",
            NamedKey::Enter => "enter",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::Tab => "tab",
            NamedKey::Space => "space",
            NamedKey::Escape => "esc",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "page_up",
            NamedKey::PageDown => "page_down",
            NamedKey::CapsLock => "caps_lock",
            NamedKey::F1 => "f1",
            NamedKey::F2 => "f2",
            NamedKey::F3 => "f3",
            NamedKey::F4 => "f4",
            NamedKey::F5 => "f5",
            NamedKey::F6 => "f6",
            NamedKey::F7 => "f7",
            NamedKey::F8 => "f8",
            NamedKey::F9 => "f9",
            NamedKey::F10 => "f10",
            NamedKey::F11 => "f11",
            NamedKey::F12 => "f12",
        }
    }
}

/// Identity of a pressed key: either the character it produces or a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Char(char),
    Named(NamedKey),
}

impl Key {
    pub fn modifier(&self) -> Option<ModifierSet> {
        match self {
            Key::Named(named) => named.modifier(),
            Key::Char(_) => None,
        }
    }

    /// Token this key contributes to a typed phrase, if any
    pub fn typing_token(&self) -> Option<String> {
        match self {
            Key::Char(c) if !c.is_control() => Some(c.to_string()),
            Key::Char(_) => None,
            Key::Named(named) => named.typing_token().map(str::to_string),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Named(named) => write!(f, "{}", named.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Left,
    Right,
    Middle,
    Other(u8),
}

impl Button {
    /// Buttons that produce click/drag actions
    pub fn is_tracked(&self) -> bool {
        matches!(self, Button::Left | Button::Right)
    }
}

/// Raw event delivered by an input source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Button {
        button: Button,
        x: f64,
        y: f64,
        pressed: bool,
    },
    Key {
        key: Key,
        pressed: bool,
    },
    Move {
        x: f64,
        y: f64,
    },
}

impl InputEvent {
    pub fn is_pointer(&self) -> bool {
        matches!(self, InputEvent::Button { .. } | InputEvent::Move { .. })
    }
}
