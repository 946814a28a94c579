// Per-scancode text cache and the keycode decode fallback

use std::collections::VecDeque;

use tracing::trace;

use super::{keys, KeyMods, Keycode, Scancode};

pub const TEXT_RING_CAPACITY: usize = 15;

/// Text produced by recent key-downs, keyed by scancode.
///
/// Holds at most one entry per scancode. When all slots are taken the
/// oldest association is dropped.
#[derive(Debug, Default)]
pub struct TextRing {
    slots: VecDeque<(Scancode, String)>,
}

impl TextRing {
    pub fn new() -> Self {
        Self {
            slots: VecDeque::with_capacity(TEXT_RING_CAPACITY),
        }
    }

    pub fn put(&mut self, scancode: Scancode, text: &str) {
        self.slots.retain(|(code, _)| *code != scancode);
        if self.slots.len() == TEXT_RING_CAPACITY {
            if let Some((dropped, _)) = self.slots.pop_front() {
                trace!(scancode = dropped.0, "text ring full, dropping oldest entry");
            }
        }
        self.slots.push_back((scancode, text.to_owned()));
    }

    pub fn get(&self, scancode: Scancode) -> Option<&str> {
        self.slots
            .iter()
            .find(|(code, _)| *code == scancode)
            .map(|(_, text)| text.as_str())
    }

    /// Remove and return the entry for `scancode`
    pub fn take(&mut self, scancode: Scancode) -> Option<String> {
        let index = self.slots.iter().position(|(code, _)| *code == scancode)?;
        self.slots.remove(index).map(|(_, text)| text)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Character a key event produces when no text input was attributed to it.
///
/// Returns `'\0'` for keys without a printable translation.
pub fn decode_fallback(key: Keycode, mods: KeyMods) -> char {
    let caps = mods.contains(KeyMods::CAPS);
    let shift = mods.intersects(KeyMods::SHIFT);

    if mods.intersects(KeyMods::CTRL) {
        if (keys::A..=keys::Z).contains(&key) {
            return char::from((key - keys::A + 1) as u8);
        }
        let control = match u8::try_from(key).ok() {
            Some(b'2' | b'@') => Some('\0'),
            Some(b'3' | b'[') => Some('\x1b'),
            Some(b'4' | b'\\') => Some('\x1c'),
            Some(b'5' | b']') => Some('\x1d'),
            Some(b'6' | b'^') => Some('\x1e'),
            Some(b'7' | b'_') => Some('\x1f'),
            Some(b'8') => Some('\x7f'),
            _ => None,
        };
        if let Some(c) = control {
            return c;
        }
    }

    if (0..128).contains(&key) {
        if caps != shift && (keys::A..=keys::Z).contains(&key) {
            return char::from((key as u8).to_ascii_uppercase());
        }
        return char::from(key as u8);
    }

    match key {
        keys::KP_PERIOD => '.',
        keys::KP_DIVIDE => '/',
        keys::KP_MULTIPLY => '*',
        keys::KP_MINUS => '-',
        keys::KP_PLUS => '+',
        keys::KP_ENTER => '\r',
        keys::KP_EQUALS => '=',
        _ => '\0',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_entry_per_scancode() {
        let mut ring = TextRing::new();
        ring.put(Scancode(4), "a");
        ring.put(Scancode(4), "A");
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(Scancode(4)), Some("A"));
        assert_eq!(ring.take(Scancode(4)), Some("A".to_string()));
        assert!(ring.get(Scancode(4)).is_none());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut ring = TextRing::new();
        for code in 0..=TEXT_RING_CAPACITY as u32 {
            ring.put(Scancode(code), "x");
        }
        assert_eq!(ring.len(), TEXT_RING_CAPACITY);
        assert!(ring.get(Scancode(0)).is_none());
        assert_eq!(ring.get(Scancode(TEXT_RING_CAPACITY as u32)), Some("x"));
    }

    #[test]
    fn test_ctrl_chords() {
        assert_eq!(decode_fallback(b'a' as Keycode, KeyMods::LCTRL), '\x01');
        assert_eq!(decode_fallback(b'z' as Keycode, KeyMods::RCTRL), '\x1a');
        assert_eq!(decode_fallback(b'2' as Keycode, KeyMods::LCTRL), '\0');
        assert_eq!(decode_fallback(b'[' as Keycode, KeyMods::LCTRL), '\x1b');
        assert_eq!(decode_fallback(b'8' as Keycode, KeyMods::LCTRL), '\x7f');
        // unmapped chords fall through to plain ASCII
        assert_eq!(decode_fallback(b'1' as Keycode, KeyMods::LCTRL), '1');
    }

    #[test]
    fn test_letter_casing() {
        let a = b'a' as Keycode;
        assert_eq!(decode_fallback(a, KeyMods::empty()), 'a');
        assert_eq!(decode_fallback(a, KeyMods::LSHIFT), 'A');
        assert_eq!(decode_fallback(a, KeyMods::CAPS), 'A');
        assert_eq!(decode_fallback(a, KeyMods::CAPS | KeyMods::RSHIFT), 'a');
        assert_eq!(decode_fallback(b'1' as Keycode, KeyMods::LSHIFT), '1');
    }

    #[test]
    fn test_keypad_and_unprintable() {
        assert_eq!(decode_fallback(keys::KP_PERIOD, KeyMods::empty()), '.');
        assert_eq!(decode_fallback(keys::KP_ENTER, KeyMods::empty()), '\r');
        assert_eq!(decode_fallback(keys::KP_EQUALS, KeyMods::empty()), '=');
        assert_eq!(decode_fallback(keys::LEFT, KeyMods::empty()), '\0');
        assert_eq!(decode_fallback(keys::KP_1, KeyMods::empty()), '\0');
    }
}
