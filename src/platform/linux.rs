// Linux platform pieces: DRM display discovery and evdev input

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd};

use tracing::{debug, info, warn};

use crate::event::{
    button_mask, keycode_from_scancode, ButtonOrigin, KeyMods, KeyboardEvent, Keycode,
    MouseButtonEvent, MouseMotionEvent, MouseWheelEvent, RawEvent, Scancode,
};
use crate::platform::headless::DisplaySpec;
use crate::platform::{InputBackend, Rect, WindowId};

// ============================================================================
// Display discovery - DRM/KMS
// ============================================================================

use drm::control::{connector, Device as ControlDevice};
use drm::Device;

/// Wrapper for DRM device that implements required traits
#[derive(Debug)]
struct DrmCard(File);

impl AsFd for DrmCard {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl Device for DrmCard {}
impl ControlDevice for DrmCard {}

/// Describe every connected output of the first DRM card that has one.
///
/// Outputs are laid out left to right in connector order, each at its
/// preferred (first listed) mode.
pub fn probe_displays() -> Result<Vec<DisplaySpec>, Box<dyn Error>> {
    for index in 0..4 {
        let path = format!("/dev/dri/card{}", index);
        let Ok(file) = OpenOptions::new().read(true).write(true).open(&path) else {
            continue;
        };
        let card = DrmCard(file);

        let res = card
            .resource_handles()
            .map_err(|e| format!("Failed to get DRM resources from {}: {}", path, e))?;

        let mut displays = Vec::new();
        let mut x = 0;
        for &handle in res.connectors() {
            let Ok(conn) = card.get_connector(handle, true) else {
                continue;
            };
            if conn.state() != connector::State::Connected {
                continue;
            }
            let Some(mode) = conn.modes().first() else {
                continue;
            };
            let (w, h) = mode.size();
            let (w, h) = (i32::from(w), i32::from(h));
            let name = format!("{:?}-{}", conn.interface(), conn.interface_id());
            debug!("{}: {} on {}x{}@{}", path, name, w, h, mode.vrefresh());

            displays.push(DisplaySpec {
                name,
                bounds: Rect::new(x, 0, w, h),
                usable: Rect::new(x, 0, w, h),
                refresh_rate: mode.vrefresh() as i32,
            });
            x += w;
        }

        if !displays.is_empty() {
            info!("Found {} display(s) on {}", displays.len(), path);
            return Ok(displays);
        }
    }
    Err("No connected display found".into())
}

// ============================================================================
// Input Backend - evdev
// ============================================================================

use input_linux::{EventKind, GenericEvent, InputEvent};

const REL_X: u16 = 0x00;
const REL_Y: u16 = 0x01;
const REL_HWHEEL: u16 = 0x06;
const REL_WHEEL: u16 = 0x08;

const BTN_LEFT: u16 = 0x110;
const BTN_RIGHT: u16 = 0x111;
const BTN_MIDDLE: u16 = 0x112;
const BTN_SIDE: u16 = 0x113;
const BTN_EXTRA: u16 = 0x114;

const KEY_LEFTCTRL: u16 = 29;
const KEY_LEFTSHIFT: u16 = 42;
const KEY_RIGHTSHIFT: u16 = 54;
const KEY_LEFTALT: u16 = 56;
const KEY_CAPSLOCK: u16 = 58;
const KEY_NUMLOCK: u16 = 69;
const KEY_RIGHTCTRL: u16 = 97;
const KEY_RIGHTALT: u16 = 100;
const KEY_LEFTMETA: u16 = 125;
const KEY_RIGHTMETA: u16 = 126;

/// evdev key code, HID scancode, keycode
const KEY_TABLE: &[(u16, u32, Keycode)] = &[
    (1, 41, 0x1b),
    (2, 30, b'1' as Keycode),
    (3, 31, b'2' as Keycode),
    (4, 32, b'3' as Keycode),
    (5, 33, b'4' as Keycode),
    (6, 34, b'5' as Keycode),
    (7, 35, b'6' as Keycode),
    (8, 36, b'7' as Keycode),
    (9, 37, b'8' as Keycode),
    (10, 38, b'9' as Keycode),
    (11, 39, b'0' as Keycode),
    (12, 45, b'-' as Keycode),
    (13, 46, b'=' as Keycode),
    (14, 42, 0x08),
    (15, 43, b'\t' as Keycode),
    (16, 20, b'q' as Keycode),
    (17, 26, b'w' as Keycode),
    (18, 8, b'e' as Keycode),
    (19, 21, b'r' as Keycode),
    (20, 23, b't' as Keycode),
    (21, 28, b'y' as Keycode),
    (22, 24, b'u' as Keycode),
    (23, 12, b'i' as Keycode),
    (24, 18, b'o' as Keycode),
    (25, 19, b'p' as Keycode),
    (26, 47, b'[' as Keycode),
    (27, 48, b']' as Keycode),
    (28, 40, b'\r' as Keycode),
    (30, 4, b'a' as Keycode),
    (31, 22, b's' as Keycode),
    (32, 7, b'd' as Keycode),
    (33, 9, b'f' as Keycode),
    (34, 10, b'g' as Keycode),
    (35, 11, b'h' as Keycode),
    (36, 13, b'j' as Keycode),
    (37, 14, b'k' as Keycode),
    (38, 15, b'l' as Keycode),
    (39, 51, b';' as Keycode),
    (40, 52, b'\'' as Keycode),
    (41, 53, b'`' as Keycode),
    (43, 49, b'\\' as Keycode),
    (44, 29, b'z' as Keycode),
    (45, 27, b'x' as Keycode),
    (46, 6, b'c' as Keycode),
    (47, 25, b'v' as Keycode),
    (48, 5, b'b' as Keycode),
    (49, 17, b'n' as Keycode),
    (50, 16, b'm' as Keycode),
    (51, 54, b',' as Keycode),
    (52, 55, b'.' as Keycode),
    (53, 56, b'/' as Keycode),
    (55, 85, keycode_from_scancode(85)),
    (57, 44, b' ' as Keycode),
    (71, 95, keycode_from_scancode(95)),
    (72, 96, keycode_from_scancode(96)),
    (73, 97, keycode_from_scancode(97)),
    (74, 86, keycode_from_scancode(86)),
    (75, 92, keycode_from_scancode(92)),
    (76, 93, keycode_from_scancode(93)),
    (77, 94, keycode_from_scancode(94)),
    (78, 87, keycode_from_scancode(87)),
    (79, 89, keycode_from_scancode(89)),
    (80, 90, keycode_from_scancode(90)),
    (81, 91, keycode_from_scancode(91)),
    (82, 98, keycode_from_scancode(98)),
    (83, 99, keycode_from_scancode(99)),
    (96, 88, keycode_from_scancode(88)),
    (98, 84, keycode_from_scancode(84)),
    (103, 82, keycode_from_scancode(82)),
    (105, 80, keycode_from_scancode(80)),
    (106, 79, keycode_from_scancode(79)),
    (108, 81, keycode_from_scancode(81)),
    (KEY_LEFTCTRL, 224, keycode_from_scancode(224)),
    (KEY_LEFTSHIFT, 225, keycode_from_scancode(225)),
    (KEY_LEFTALT, 226, keycode_from_scancode(226)),
    (KEY_LEFTMETA, 227, keycode_from_scancode(227)),
    (KEY_RIGHTCTRL, 228, keycode_from_scancode(228)),
    (KEY_RIGHTSHIFT, 229, keycode_from_scancode(229)),
    (KEY_RIGHTALT, 230, keycode_from_scancode(230)),
    (KEY_RIGHTMETA, 231, keycode_from_scancode(231)),
    (KEY_CAPSLOCK, 57, keycode_from_scancode(57)),
    (KEY_NUMLOCK, 83, keycode_from_scancode(83)),
];

fn key_info(code: u16) -> Option<(Scancode, Keycode)> {
    KEY_TABLE
        .iter()
        .find(|(evdev, _, _)| *evdev == code)
        .map(|&(_, scancode, key)| (Scancode(scancode), key))
}

fn held_modifier(code: u16) -> Option<KeyMods> {
    match code {
        KEY_LEFTSHIFT => Some(KeyMods::LSHIFT),
        KEY_RIGHTSHIFT => Some(KeyMods::RSHIFT),
        KEY_LEFTCTRL => Some(KeyMods::LCTRL),
        KEY_RIGHTCTRL => Some(KeyMods::RCTRL),
        KEY_LEFTALT => Some(KeyMods::LALT),
        KEY_RIGHTALT => Some(KeyMods::RALT),
        KEY_LEFTMETA => Some(KeyMods::LGUI),
        KEY_RIGHTMETA => Some(KeyMods::RGUI),
        _ => None,
    }
}

/// Native button index and state mask bit for an evdev button code
fn button_info(code: u16) -> Option<(u8, u32)> {
    match code {
        BTN_LEFT => Some((1, button_mask::LEFT)),
        BTN_MIDDLE => Some((2, button_mask::MIDDLE)),
        BTN_RIGHT => Some((3, button_mask::RIGHT)),
        BTN_SIDE => Some((4, button_mask::X1)),
        BTN_EXTRA => Some((5, button_mask::X2)),
        _ => None,
    }
}

/// Keyboards and mice read straight from /dev/input
pub struct EvdevInput {
    devices: Vec<File>,
    next_device: usize,
    window: WindowId,
    bounds: (i32, i32),
    pointer: (i32, i32),
    buttons: u32,
    mods: KeyMods,
}

impl EvdevInput {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        debug!("Scanning for input devices...");
        let mut devices = Vec::new();
        for i in 0..32 {
            let path = format!("/dev/input/event{}", i);
            if let Ok(file) = OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&path)
            {
                let name = get_device_name(file.as_raw_fd());
                let lower = name.to_lowercase();
                debug!("  {}: {}", path, name);
                if ["keyboard", "mouse", "touchpad", "input"]
                    .iter()
                    .any(|needle| lower.contains(needle))
                {
                    info!("Using input: {} ({})", path, name);
                    devices.push(file);
                }
            }
        }

        if devices.is_empty() {
            return Err("No keyboard or mouse input device found".into());
        }
        Ok(Self::with_devices(devices))
    }

    fn with_devices(devices: Vec<File>) -> Self {
        Self {
            devices,
            next_device: 0,
            window: WindowId(0),
            bounds: (0, 0),
            pointer: (0, 0),
            buttons: 0,
            mods: KeyMods::empty(),
        }
    }

    /// Route events to `window`, clamping the pointer to its size
    pub fn attach(&mut self, window: WindowId, w: i32, h: i32) {
        self.window = window;
        self.bounds = (w, h);
        self.pointer = (w / 2, h / 2);
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn translate(&mut self, kind: EventKind, code: u16, value: i32) -> Option<RawEvent> {
        match kind {
            EventKind::Key => {
                if let Some((button, mask)) = button_info(code) {
                    return Some(self.translate_button(button, mask, value != 0));
                }
                self.translate_key(code, value)
            }
            EventKind::Relative => self.translate_relative(code, value),
            _ => None,
        }
    }

    fn translate_key(&mut self, code: u16, value: i32) -> Option<RawEvent> {
        let (scancode, key) = key_info(code)?;
        let pressed = value != 0;

        if let Some(held) = held_modifier(code) {
            self.mods.set(held, pressed);
        } else if value == 1 && code == KEY_CAPSLOCK {
            self.mods.toggle(KeyMods::CAPS);
        } else if value == 1 && code == KEY_NUMLOCK {
            self.mods.toggle(KeyMods::NUM);
        }

        let event = KeyboardEvent {
            window: self.window,
            scancode,
            key,
            mods: self.mods,
            repeat: value == 2,
        };
        Some(if pressed {
            RawEvent::KeyDown(event)
        } else {
            RawEvent::KeyUp(event)
        })
    }

    fn translate_button(&mut self, button: u8, mask: u32, pressed: bool) -> RawEvent {
        if pressed {
            self.buttons |= mask;
        } else {
            self.buttons &= !mask;
        }
        let event = MouseButtonEvent {
            window: self.window,
            which: 0,
            button,
            x: self.pointer.0,
            y: self.pointer.1,
            clicks: 1,
            origin: ButtonOrigin::Native,
        };
        if pressed {
            RawEvent::MouseButtonDown(event)
        } else {
            RawEvent::MouseButtonUp(event)
        }
    }

    fn translate_relative(&mut self, code: u16, value: i32) -> Option<RawEvent> {
        let wheel = |x, y| {
            RawEvent::MouseWheel(MouseWheelEvent {
                window: self.window,
                which: 0,
                x,
                y,
                flipped: false,
            })
        };
        match code {
            REL_WHEEL => Some(wheel(0, value)),
            REL_HWHEEL => Some(wheel(value, 0)),
            REL_X | REL_Y => {
                let (dx, dy) = if code == REL_X { (value, 0) } else { (0, value) };
                let (max_x, max_y) = ((self.bounds.0 - 1).max(0), (self.bounds.1 - 1).max(0));
                let x = (self.pointer.0 + dx).clamp(0, max_x);
                let y = (self.pointer.1 + dy).clamp(0, max_y);
                let (xrel, yrel) = (x - self.pointer.0, y - self.pointer.1);
                self.pointer = (x, y);
                Some(RawEvent::MouseMotion(MouseMotionEvent {
                    window: self.window,
                    which: 0,
                    x,
                    y,
                    xrel,
                    yrel,
                    buttons: self.buttons,
                }))
            }
            _ => None,
        }
    }
}

impl InputBackend for EvdevInput {
    fn poll_event(&mut self) -> Option<RawEvent> {
        // Read events in non-blocking mode, one device after another
        let count = self.devices.len();
        for _ in 0..count {
            let index = self.next_device % count;
            loop {
                let mut event = InputEvent::zeroed();
                match read_input_event(&mut self.devices[index], &mut event) {
                    Ok(true) => {
                        if let Some(raw) = self.translate(event.kind, event.code, event.value()) {
                            return Some(raw);
                        }
                    }
                    Ok(false) => break, // No more events on this device
                    Err(e) => {
                        warn!("Input read failed: {}", e);
                        break;
                    }
                }
            }
            self.next_device = index + 1;
        }
        None
    }

    fn pointer_position(&self) -> (i32, i32) {
        self.pointer
    }
}

// Helper functions for Linux input

fn get_device_name(fd: i32) -> String {
    // EVIOCGNAME ioctl: _IOC(_IOC_READ, 'E', 0x06, len)
    const _IOC_NRBITS: u32 = 8;
    const _IOC_TYPEBITS: u32 = 8;
    const _IOC_SIZEBITS: u32 = 14;
    const _IOC_NRSHIFT: u32 = 0;
    const _IOC_TYPESHIFT: u32 = _IOC_NRSHIFT + _IOC_NRBITS;
    const _IOC_SIZESHIFT: u32 = _IOC_TYPESHIFT + _IOC_TYPEBITS;
    const _IOC_DIRSHIFT: u32 = _IOC_SIZESHIFT + _IOC_SIZEBITS;
    const _IOC_READ: u32 = 2;

    const EVIOCGNAME_256: u32 = (_IOC_READ << _IOC_DIRSHIFT)
                               | (0x45 << _IOC_TYPESHIFT)  // 'E'
                               | (0x06 << _IOC_NRSHIFT)
                               | (256 << _IOC_SIZESHIFT);

    let mut name = vec![0u8; 256];
    unsafe {
        if libc::ioctl(fd, EVIOCGNAME_256 as _, name.as_mut_ptr()) >= 0 {
            let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
            String::from_utf8_lossy(&name[..len]).to_string()
        } else {
            "Unknown".to_string()
        }
    }
}

fn read_input_event(file: &mut File, event: &mut InputEvent) -> io::Result<bool> {
    use std::io::Read;

    let event_bytes = unsafe {
        std::slice::from_raw_parts_mut(
            event as *mut _ as *mut u8,
            std::mem::size_of::<InputEvent>(),
        )
    };

    match file.read_exact(event_bytes) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::keys;

    fn input() -> EvdevInput {
        let mut input = EvdevInput::with_devices(Vec::new());
        input.attach(WindowId(3), 100, 80);
        input
    }

    #[test]
    fn test_key_press_and_release() {
        let mut input = input();
        match input.translate(EventKind::Key, 30, 1) {
            Some(RawEvent::KeyDown(key)) => {
                assert_eq!(key.scancode, Scancode(4));
                assert_eq!(key.key, keys::A);
                assert_eq!(key.window, WindowId(3));
                assert!(!key.repeat);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            input.translate(EventKind::Key, 30, 2),
            Some(RawEvent::KeyDown(KeyboardEvent { repeat: true, .. }))
        ));
        assert!(matches!(
            input.translate(EventKind::Key, 30, 0),
            Some(RawEvent::KeyUp(_))
        ));
    }

    #[test]
    fn test_modifier_tracking() {
        let mut input = input();
        input.translate(EventKind::Key, KEY_LEFTSHIFT, 1);
        input.translate(EventKind::Key, KEY_CAPSLOCK, 1);
        input.translate(EventKind::Key, KEY_CAPSLOCK, 0);
        match input.translate(EventKind::Key, 30, 1) {
            Some(RawEvent::KeyDown(key)) => {
                assert!(key.mods.contains(KeyMods::LSHIFT | KeyMods::CAPS));
            }
            other => panic!("unexpected {:?}", other),
        }
        input.translate(EventKind::Key, KEY_LEFTSHIFT, 0);
        input.translate(EventKind::Key, KEY_CAPSLOCK, 1);
        assert!(input.mods.is_empty());
    }

    #[test]
    fn test_motion_clamps_to_window() {
        let mut input = input();
        input.translate(EventKind::Relative, REL_X, 1000);
        match input.translate(EventKind::Relative, REL_Y, -5) {
            Some(RawEvent::MouseMotion(motion)) => {
                assert_eq!((motion.x, motion.y), (99, 35));
                assert_eq!((motion.xrel, motion.yrel), (0, -5));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(input.pointer_position(), (99, 35));
    }

    #[test]
    fn test_buttons_and_wheel() {
        let mut input = input();
        match input.translate(EventKind::Key, BTN_SIDE, 1) {
            Some(RawEvent::MouseButtonDown(click)) => assert_eq!(click.button, 4),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(input.buttons, button_mask::X1);
        input.translate(EventKind::Key, BTN_SIDE, 0);
        assert_eq!(input.buttons, 0);

        assert!(matches!(
            input.translate(EventKind::Relative, REL_WHEEL, -2),
            Some(RawEvent::MouseWheel(MouseWheelEvent { x: 0, y: -2, .. }))
        ));
        assert!(input.translate(EventKind::Synchronize, 0, 0).is_none());
    }
}
