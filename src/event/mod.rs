// Event vocabulary: raw events from the input backend and the normalized
// events the pipeline hands to the application queue

pub mod facade;
pub mod pipeline;
pub mod queue;
pub mod repeat;
pub mod text;

use bitflags::bitflags;

use crate::platform::WindowId;

pub use facade::{EventRecord, Value};
pub use pipeline::EventPipeline;
pub use queue::EventQueue;

// ============================================================================
// Keyboard
// ============================================================================

/// Physical key identifier (USB HID usage), independent of layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scancode(pub u32);

/// Layout-dependent key symbol. Printable keys use their ASCII value,
/// everything else is `scancode | KEYCODE_SCANCODE_MASK`.
pub type Keycode = i32;

pub const KEYCODE_SCANCODE_MASK: i32 = 1 << 30;

pub const fn keycode_from_scancode(scancode: u32) -> Keycode {
    scancode as i32 | KEYCODE_SCANCODE_MASK
}

pub mod keys {
    use super::{keycode_from_scancode, Keycode};

    pub const RETURN: Keycode = b'\r' as Keycode;
    pub const ESCAPE: Keycode = 0x1b;
    pub const BACKSPACE: Keycode = 0x08;
    pub const TAB: Keycode = b'\t' as Keycode;
    pub const SPACE: Keycode = b' ' as Keycode;
    pub const A: Keycode = b'a' as Keycode;
    pub const Z: Keycode = b'z' as Keycode;

    pub const CAPSLOCK: Keycode = keycode_from_scancode(57);
    pub const RIGHT: Keycode = keycode_from_scancode(79);
    pub const LEFT: Keycode = keycode_from_scancode(80);
    pub const DOWN: Keycode = keycode_from_scancode(81);
    pub const UP: Keycode = keycode_from_scancode(82);
    pub const NUMLOCK: Keycode = keycode_from_scancode(83);
    pub const KP_DIVIDE: Keycode = keycode_from_scancode(84);
    pub const KP_MULTIPLY: Keycode = keycode_from_scancode(85);
    pub const KP_MINUS: Keycode = keycode_from_scancode(86);
    pub const KP_PLUS: Keycode = keycode_from_scancode(87);
    pub const KP_ENTER: Keycode = keycode_from_scancode(88);
    pub const KP_1: Keycode = keycode_from_scancode(89);
    pub const KP_0: Keycode = keycode_from_scancode(98);
    pub const KP_PERIOD: Keycode = keycode_from_scancode(99);
    pub const KP_EQUALS: Keycode = keycode_from_scancode(103);
    pub const LCTRL: Keycode = keycode_from_scancode(224);
    pub const LSHIFT: Keycode = keycode_from_scancode(225);
    pub const LALT: Keycode = keycode_from_scancode(226);
    pub const LGUI: Keycode = keycode_from_scancode(227);
    pub const RCTRL: Keycode = keycode_from_scancode(228);
    pub const RSHIFT: Keycode = keycode_from_scancode(229);
    pub const RALT: Keycode = keycode_from_scancode(230);
    pub const RGUI: Keycode = keycode_from_scancode(231);
}

bitflags! {
    /// Keyboard modifier state at the time of a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyMods: u16 {
        const LSHIFT = 0x0001;
        const RSHIFT = 0x0002;
        const LCTRL = 0x0040;
        const RCTRL = 0x0080;
        const LALT = 0x0100;
        const RALT = 0x0200;
        const LGUI = 0x0400;
        const RGUI = 0x0800;
        const NUM = 0x1000;
        const CAPS = 0x2000;
        const MODE = 0x4000;

        const SHIFT = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        const CTRL = Self::LCTRL.bits() | Self::RCTRL.bits();
        const ALT = Self::LALT.bits() | Self::RALT.bits();
        const GUI = Self::LGUI.bits() | Self::RGUI.bits();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub window: WindowId,
    pub scancode: Scancode,
    pub key: Keycode,
    pub mods: KeyMods,
    /// Set for native auto-repeat and for repeats synthesized by the pipeline
    pub repeat: bool,
}

/// A key event in the application queue with the text attributed to it.
///
/// `text` is filled from text input that followed the key-down, and moved
/// onto the key-up when the key is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: KeyboardEvent,
    pub text: Option<String>,
}

impl KeyPress {
    pub fn new(key: KeyboardEvent) -> Self {
        Self { key, text: None }
    }

    /// The attributed text, or the keycode decoded under the held modifiers
    pub fn unicode(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => match text::decode_fallback(self.key.key, self.key.mods) {
                '\0' => String::new(),
                c => c.to_string(),
            },
        }
    }
}

// ============================================================================
// Mouse
// ============================================================================

/// Button indices as seen by the application
pub mod button {
    pub const LEFT: u8 = 1;
    pub const MIDDLE: u8 = 2;
    pub const RIGHT: u8 = 3;
    pub const WHEEL_UP: u8 = 4;
    pub const WHEEL_DOWN: u8 = 5;
    pub const X1: u8 = 6;
    pub const X2: u8 = 7;
}

/// Native button state mask bits reported with motion events
pub mod button_mask {
    pub const LEFT: u32 = 1 << 0;
    pub const MIDDLE: u32 = 1 << 1;
    pub const RIGHT: u32 = 1 << 2;
    pub const X1: u32 = 1 << 3;
    pub const X2: u32 = 1 << 4;
}

/// Mouse id reported for events synthesized from touch input
pub const TOUCH_MOUSE_ID: u32 = u32::MAX;

/// Where a button event came from. Wheel-derived clicks keep their
/// wheel indices; native side buttons are shifted past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonOrigin {
    #[default]
    Native,
    Wheel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub window: WindowId,
    pub which: u32,
    pub button: u8,
    pub x: i32,
    pub y: i32,
    pub clicks: u8,
    pub origin: ButtonOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseMotionEvent {
    pub window: WindowId,
    pub which: u32,
    pub x: i32,
    pub y: i32,
    pub xrel: i32,
    pub yrel: i32,
    /// Native button state mask, see [`button_mask`]
    pub buttons: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseWheelEvent {
    pub window: WindowId,
    pub which: u32,
    pub x: i32,
    pub y: i32,
    pub flipped: bool,
}

// ============================================================================
// Window
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WindowEventKind {
    Shown,
    Hidden,
    Exposed,
    Moved,
    Resized,
    SizeChanged,
    Minimized,
    Maximized,
    Restored,
    Enter,
    Leave,
    FocusGained,
    FocusLost,
    Close,
    TakeFocus,
    HitTest,
}

impl WindowEventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Shown => "WindowShown",
            Self::Hidden => "WindowHidden",
            Self::Exposed => "WindowExposed",
            Self::Moved => "WindowMoved",
            Self::Resized => "WindowResized",
            Self::SizeChanged => "WindowSizeChanged",
            Self::Minimized => "WindowMinimized",
            Self::Maximized => "WindowMaximized",
            Self::Restored => "WindowRestored",
            Self::Enter => "WindowEnter",
            Self::Leave => "WindowLeave",
            Self::FocusGained => "WindowFocusGained",
            Self::FocusLost => "WindowFocusLost",
            Self::Close => "WindowClose",
            Self::TakeFocus => "WindowTakeFocus",
            Self::HitTest => "WindowHitTest",
        }
    }
}

/// Category carried by an `Active` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActiveState {
    MouseFocus = 1,
    InputFocus = 2,
    AppActive = 4,
}

// ============================================================================
// Raw and normalized events
// ============================================================================

/// An event as delivered by an `InputBackend`, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Quit,
    Window {
        window: WindowId,
        event: WindowEventKind,
        data1: i32,
        data2: i32,
    },
    KeyDown(KeyboardEvent),
    KeyUp(KeyboardEvent),
    TextInput {
        window: WindowId,
        text: String,
    },
    MouseMotion(MouseMotionEvent),
    MouseButtonDown(MouseButtonEvent),
    MouseButtonUp(MouseButtonEvent),
    MouseWheel(MouseWheelEvent),
    JoyAxis {
        instance_id: u32,
        axis: u8,
        value: i16,
    },
    JoyHat {
        instance_id: u32,
        hat: u8,
        /// Native hat bitmask: up 1, right 2, down 4, left 8
        value: u8,
    },
    JoyButtonDown {
        instance_id: u32,
        button: u8,
    },
    JoyButtonUp {
        instance_id: u32,
        button: u8,
    },
}

/// A normalized event as stored in the application queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Quit,
    Active {
        gain: bool,
        state: ActiveState,
    },
    VideoResize {
        window: WindowId,
        w: i32,
        h: i32,
    },
    VideoExpose {
        window: WindowId,
    },
    Window {
        window: WindowId,
        kind: WindowEventKind,
        data1: i32,
        data2: i32,
    },
    KeyDown(KeyPress),
    KeyUp(KeyPress),
    TextInput {
        window: WindowId,
        text: String,
    },
    MouseMotion(MouseMotionEvent),
    MouseButtonDown(MouseButtonEvent),
    MouseButtonUp(MouseButtonEvent),
    MouseWheel(MouseWheelEvent),
    JoyAxis {
        instance_id: u32,
        axis: u8,
        value: i16,
    },
    JoyHat {
        instance_id: u32,
        hat: u8,
        value: u8,
    },
    JoyButtonDown {
        instance_id: u32,
        button: u8,
    },
    JoyButtonUp {
        instance_id: u32,
        button: u8,
    },
    /// Application-posted record, delivered back unchanged
    Posted(EventRecord),
}

/// Event type tag used for blocking, filtering and record conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Quit,
    ActiveEvent,
    VideoResize,
    VideoExpose,
    Window(WindowEventKind),
    KeyDown,
    KeyUp,
    TextInput,
    MouseMotion,
    MouseButtonDown,
    MouseButtonUp,
    MouseWheel,
    JoyAxisMotion,
    JoyHatMotion,
    JoyButtonDown,
    JoyButtonUp,
    User(u16),
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::ActiveEvent => "ActiveEvent",
            Self::VideoResize => "VideoResize",
            Self::VideoExpose => "VideoExpose",
            Self::Window(kind) => kind.name(),
            Self::KeyDown => "KeyDown",
            Self::KeyUp => "KeyUp",
            Self::TextInput => "TextInput",
            Self::MouseMotion => "MouseMotion",
            Self::MouseButtonDown => "MouseButtonDown",
            Self::MouseButtonUp => "MouseButtonUp",
            Self::MouseWheel => "MouseWheel",
            Self::JoyAxisMotion => "JoyAxisMotion",
            Self::JoyHatMotion => "JoyHatMotion",
            Self::JoyButtonDown => "JoyButtonDown",
            Self::JoyButtonUp => "JoyButtonUp",
            Self::User(_) => "UserEvent",
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Quit => EventKind::Quit,
            Self::Active { .. } => EventKind::ActiveEvent,
            Self::VideoResize { .. } => EventKind::VideoResize,
            Self::VideoExpose { .. } => EventKind::VideoExpose,
            Self::Window { kind, .. } => EventKind::Window(*kind),
            Self::KeyDown(_) => EventKind::KeyDown,
            Self::KeyUp(_) => EventKind::KeyUp,
            Self::TextInput { .. } => EventKind::TextInput,
            Self::MouseMotion(_) => EventKind::MouseMotion,
            Self::MouseButtonDown(_) => EventKind::MouseButtonDown,
            Self::MouseButtonUp(_) => EventKind::MouseButtonUp,
            Self::MouseWheel(_) => EventKind::MouseWheel,
            Self::JoyAxis { .. } => EventKind::JoyAxisMotion,
            Self::JoyHat { .. } => EventKind::JoyHatMotion,
            Self::JoyButtonDown { .. } => EventKind::JoyButtonDown,
            Self::JoyButtonUp { .. } => EventKind::JoyButtonUp,
            Self::Posted(record) => record.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypad_keycodes_carry_scancode_mask() {
        assert_eq!(keys::KP_PERIOD, (1 << 30) | 99);
        assert_eq!(keys::KP_ENTER & !KEYCODE_SCANCODE_MASK, 88);
        assert!(keys::A < 128);
    }

    #[test]
    fn test_composite_mods() {
        assert!(KeyMods::RSHIFT.intersects(KeyMods::SHIFT));
        assert!(!KeyMods::CAPS.intersects(KeyMods::SHIFT));
        assert_eq!(KeyMods::CTRL.bits(), 0x00c0);
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::ActiveEvent.name(), "ActiveEvent");
        assert_eq!(
            EventKind::Window(WindowEventKind::SizeChanged).name(),
            "WindowSizeChanged"
        );
        assert_eq!(EventKind::User(3).name(), "UserEvent");
    }
}
