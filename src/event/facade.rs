// Application-facing event records
//
// Records carry a kind plus named attributes, mirroring the dictionaries
// pygame exposes on its event objects.

use std::collections::BTreeMap;
use std::fmt;

use super::{button_mask, Event, EventKind, KeyPress, WindowEventKind, TOUCH_MOUSE_ID};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Tuple(Vec<i64>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<(i32, i32)> for Value {
    fn from((a, b): (i32, i32)) -> Self {
        Value::Tuple(vec![i64::from(a), i64::from(b)])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    kind: EventKind,
    attrs: BTreeMap<String, Value>,
}

impl EventRecord {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
        }
    }

    /// Record for an application-defined event type
    pub fn user(code: u16) -> Self {
        Self::new(EventKind::User(code))
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.to_owned(), value.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.attrs.get(name)? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.attrs.get(name)? {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.attrs.get(name)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.attrs.get(name)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn tuple(&self, name: &str) -> Option<&[i64]> {
        match self.attrs.get(name)? {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Event({} {{", self.kind.name())?;
        for (i, (name, value)) in self.attrs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}})>")
    }
}

// ============================================================================
// Conversion from queued events
// ============================================================================

/// Build the application record for a queued event.
///
/// Key records carry their attributed text as `unicode`, falling back to
/// the decoded keycode.
pub fn record_from_event(event: Event) -> EventRecord {
    let kind = event.kind();
    let record = EventRecord::new(kind);
    match event {
        Event::Quit | Event::VideoExpose { .. } => record,
        Event::Active { gain, state } => record
            .with("gain", i64::from(gain))
            .with("state", state as u8),
        Event::VideoResize { w, h, .. } => record.with("size", (w, h)).with("w", w).with("h", h),
        Event::Window {
            window,
            kind,
            data1,
            data2,
        } => {
            let record = record.with("window", window.0);
            match kind {
                WindowEventKind::Moved | WindowEventKind::Resized | WindowEventKind::SizeChanged => {
                    record.with("x", data1).with("y", data2)
                }
                _ => record,
            }
        }
        Event::KeyDown(press) | Event::KeyUp(press) => key_record(record, &press),
        Event::TextInput { window, text } => record.with("text", text).with("window", window.0),
        Event::MouseMotion(motion) => record
            .with("pos", (motion.x, motion.y))
            .with("rel", (motion.xrel, motion.yrel))
            .with(
                "buttons",
                Value::Tuple(
                    [button_mask::LEFT, button_mask::MIDDLE, button_mask::RIGHT]
                        .iter()
                        .map(|mask| i64::from(motion.buttons & mask != 0))
                        .collect(),
                ),
            )
            .with("touch", motion.which == TOUCH_MOUSE_ID)
            .with("window", motion.window.0),
        Event::MouseButtonDown(click) | Event::MouseButtonUp(click) => record
            .with("pos", (click.x, click.y))
            .with("button", click.button)
            .with("touch", click.which == TOUCH_MOUSE_ID)
            .with("window", click.window.0),
        Event::MouseWheel(wheel) => record
            .with("x", wheel.x)
            .with("y", wheel.y)
            .with("flipped", wheel.flipped)
            .with("which", wheel.which)
            .with("touch", wheel.which == TOUCH_MOUSE_ID)
            .with("window", wheel.window.0),
        Event::JoyAxis {
            instance_id,
            axis,
            value,
        } => record
            .with("instance_id", instance_id)
            .with("axis", axis)
            .with("value", normalize_axis(value)),
        Event::JoyHat {
            instance_id,
            hat,
            value,
        } => record
            .with("instance_id", instance_id)
            .with("hat", hat)
            .with("value", hat_position(value)),
        Event::JoyButtonDown {
            instance_id,
            button,
        }
        | Event::JoyButtonUp {
            instance_id,
            button,
        } => record
            .with("instance_id", instance_id)
            .with("button", button),
        Event::Posted(posted) => posted,
    }
}

fn key_record(record: EventRecord, press: &KeyPress) -> EventRecord {
    let key = &press.key;
    record
        .with("unicode", press.unicode())
        .with("key", key.key)
        .with("mods", u32::from(key.mods.bits()))
        .with("scancode", key.scancode.0)
        .with("repeat", key.repeat)
        .with("window", key.window.0)
}

fn normalize_axis(value: i16) -> f64 {
    (f64::from(value) / 32767.0).clamp(-1.0, 1.0)
}

fn hat_position(value: u8) -> (i32, i32) {
    const UP: u8 = 0x01;
    const RIGHT: u8 = 0x02;
    const DOWN: u8 = 0x04;
    const LEFT: u8 = 0x08;

    let x = if value & RIGHT != 0 {
        1
    } else if value & LEFT != 0 {
        -1
    } else {
        0
    };
    let y = if value & UP != 0 {
        1
    } else if value & DOWN != 0 {
        -1
    } else {
        0
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ActiveState, KeyMods, KeyboardEvent, MouseMotionEvent, Scancode};
    use crate::platform::WindowId;

    #[test]
    fn test_axis_normalization() {
        assert_eq!(normalize_axis(32767), 1.0);
        assert_eq!(normalize_axis(-32768), -1.0);
        assert_eq!(normalize_axis(0), 0.0);
    }

    #[test]
    fn test_hat_position() {
        assert_eq!(hat_position(0), (0, 0));
        assert_eq!(hat_position(0x01 | 0x02), (1, 1));
        assert_eq!(hat_position(0x04 | 0x08), (-1, -1));
    }

    #[test]
    fn test_motion_record() {
        let motion = MouseMotionEvent {
            window: WindowId(1),
            which: TOUCH_MOUSE_ID,
            x: 5,
            y: 6,
            xrel: -1,
            yrel: 2,
            buttons: button_mask::LEFT | button_mask::RIGHT,
        };
        let record = record_from_event(Event::MouseMotion(motion));
        assert_eq!(record.kind(), EventKind::MouseMotion);
        assert_eq!(record.tuple("pos"), Some(&[5, 6][..]));
        assert_eq!(record.tuple("rel"), Some(&[-1, 2][..]));
        assert_eq!(record.tuple("buttons"), Some(&[1, 0, 1][..]));
        assert_eq!(record.bool("touch"), Some(true));
    }

    #[test]
    fn test_unprintable_key_has_empty_unicode() {
        let key = KeyboardEvent {
            window: WindowId(1),
            scancode: Scancode(80),
            key: crate::event::keys::LEFT,
            mods: KeyMods::empty(),
            repeat: false,
        };
        let record = record_from_event(Event::KeyDown(KeyPress::new(key)));
        assert_eq!(record.text("unicode"), Some(""));
        assert_eq!(record.int("scancode"), Some(80));
    }

    #[test]
    fn test_display_format() {
        let record = record_from_event(
            Event::Active {
                gain: true,
                state: ActiveState::InputFocus,
            },
        );
        assert_eq!(record.to_string(), "<Event(ActiveEvent {gain: 1, state: 2})>");

        let posted = EventRecord::user(1).with("msg", "hi");
        assert_eq!(posted.to_string(), "<Event(UserEvent {msg: \"hi\"})>");
    }
}
