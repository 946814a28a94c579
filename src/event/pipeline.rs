// Event normalization pipeline
//
// Every raw event passes through `EventPipeline::filter` before anything
// reaches the application queue. The filter pushes synthetic events
// (resize, expose, active, wheel clicks) straight into the queue and hands
// back the normalized original, or None when the original is dropped.

use std::time::Duration;

use flume::{Receiver, Sender};
use tracing::{debug, trace};

use super::queue::EventQueue;
use super::repeat::{RepeatFire, RepeatTimer};
use super::text::TextRing;
use super::{
    button, ActiveState, ButtonOrigin, Event, KeyPress, KeyboardEvent, MouseButtonEvent,
    MouseWheelEvent, RawEvent, Scancode, WindowEventKind,
};
use crate::error::{Error, Result};
use crate::platform::WindowId;

pub struct EventPipeline {
    repeat_delay: u32,
    repeat_interval: u32,
    armed: Option<RepeatTimer>,
    next_generation: u64,
    fire_tx: Sender<RepeatFire>,
    fire_rx: Receiver<RepeatFire>,
    awaiting_text: Option<Scancode>,
    text: TextRing,
}

impl Default for EventPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPipeline {
    pub fn new() -> Self {
        let (fire_tx, fire_rx) = flume::unbounded();
        Self {
            repeat_delay: 0,
            repeat_interval: 0,
            armed: None,
            next_generation: 0,
            fire_tx,
            fire_rx,
            awaiting_text: None,
            text: TextRing::new(),
        }
    }

    // ========================================================================
    // Key repeat configuration
    // ========================================================================

    /// Configure key repeat in milliseconds. A zero delay disables it.
    pub fn set_repeat(&mut self, delay: i32, interval: i32) -> Result<()> {
        if delay < 0 {
            return Err(Error::config("delay must be positive"));
        }
        if interval < 0 {
            return Err(Error::config("interval must be positive"));
        }
        let interval = if delay > 0 && interval == 0 { delay } else { interval };
        self.repeat_delay = delay as u32;
        self.repeat_interval = interval as u32;
        debug!(delay, interval, "key repeat configured");
        Ok(())
    }

    pub fn repeat(&self) -> (u32, u32) {
        (self.repeat_delay, self.repeat_interval)
    }

    pub fn repeat_armed(&self) -> bool {
        self.armed.is_some()
    }

    fn cancel_repeat(&mut self) {
        if let Some(timer) = self.armed.take() {
            trace!(generation = timer.generation(), "key repeat cancelled");
        }
    }

    fn arm_repeat(&mut self, template: &KeyboardEvent) {
        self.cancel_repeat();
        self.next_generation += 1;
        self.armed = RepeatTimer::arm(
            self.next_generation,
            template.clone(),
            Duration::from_millis(u64::from(self.repeat_delay)),
            Duration::from_millis(u64::from(self.repeat_interval)),
            self.fire_tx.clone(),
        );
    }

    /// Collect repeat ticks delivered since the last call, as key-down events.
    ///
    /// Ticks from timers that have since been cancelled or replaced are
    /// discarded.
    pub fn drain_repeats(&mut self) -> Vec<Event> {
        let live = self.armed.as_ref().map(RepeatTimer::generation);
        self.fire_rx
            .try_iter()
            .filter(|fire| Some(fire.generation) == live)
            .map(|fire| self.filter_repeat(fire))
            .collect()
    }

    /// Turn a repeat tick back into a pressed key-down with the repeat marker
    pub fn filter_repeat(&self, fire: RepeatFire) -> Event {
        let mut key = fire.key;
        key.repeat = true;
        let text = self.text.get(key.scancode).map(str::to_owned);
        Event::KeyDown(KeyPress { key, text })
    }

    // ========================================================================
    // Filter
    // ========================================================================

    /// Normalize one raw event.
    ///
    /// Synthetic events are pushed into `queue` before returning. `pointer`
    /// is the current pointer position, used to place wheel clicks.
    pub fn filter(
        &mut self,
        raw: RawEvent,
        queue: &mut EventQueue,
        pointer: (i32, i32),
    ) -> Option<Event> {
        match raw {
            RawEvent::Quit => Some(Event::Quit),

            RawEvent::Window {
                window,
                event,
                data1,
                data2,
            } => {
                self.filter_window(window, event, data1, data2, queue);
                Some(Event::Window {
                    window,
                    kind: event,
                    data1,
                    data2,
                })
            }

            RawEvent::KeyDown(key) => {
                if key.repeat {
                    return None;
                }
                if self.repeat_delay > 0 {
                    self.arm_repeat(&key);
                }
                self.awaiting_text = Some(key.scancode);
                Some(Event::KeyDown(KeyPress::new(key)))
            }

            RawEvent::KeyUp(key) => {
                let matches = self
                    .armed
                    .as_ref()
                    .is_some_and(|timer| timer.template().scancode == key.scancode);
                if matches {
                    self.cancel_repeat();
                }
                if self.awaiting_text == Some(key.scancode) {
                    self.awaiting_text = None;
                }
                // released keys give up their text even if the key-up is never read
                let text = self.text.take(key.scancode);
                Some(Event::KeyUp(KeyPress { key, text }))
            }

            RawEvent::TextInput { window, text } => {
                if let Some(scancode) = self.awaiting_text.take() {
                    self.text.put(scancode, &text);
                    let pending = queue.last_mut_where(|event| {
                        matches!(event, Event::KeyDown(press) if press.key.scancode == scancode)
                    });
                    if let Some(Event::KeyDown(press)) = pending {
                        press.text.get_or_insert_with(|| text.clone());
                    }
                }
                Some(Event::TextInput { window, text })
            }

            RawEvent::MouseMotion(motion) => Some(Event::MouseMotion(motion)),

            RawEvent::MouseButtonDown(press) => Some(Event::MouseButtonDown(remap_button(press))),
            RawEvent::MouseButtonUp(release) => Some(Event::MouseButtonUp(remap_button(release))),

            RawEvent::MouseWheel(wheel) => {
                if wheel.x == 0 && wheel.y == 0 {
                    return None;
                }
                push_wheel_clicks(&wheel, pointer, queue);
                Some(Event::MouseWheel(wheel))
            }

            RawEvent::JoyAxis {
                instance_id,
                axis,
                value,
            } => Some(Event::JoyAxis {
                instance_id,
                axis,
                value,
            }),
            RawEvent::JoyHat {
                instance_id,
                hat,
                value,
            } => Some(Event::JoyHat {
                instance_id,
                hat,
                value,
            }),
            RawEvent::JoyButtonDown {
                instance_id,
                button,
            } => Some(Event::JoyButtonDown {
                instance_id,
                button,
            }),
            RawEvent::JoyButtonUp {
                instance_id,
                button,
            } => Some(Event::JoyButtonUp {
                instance_id,
                button,
            }),
        }
    }

    fn filter_window(
        &mut self,
        window: WindowId,
        kind: WindowEventKind,
        data1: i32,
        data2: i32,
        queue: &mut EventQueue,
    ) {
        match kind {
            WindowEventKind::Resized => {
                let removed = queue.remove_where(
                    |e| matches!(e, Event::VideoResize { window: w, .. } if *w == window),
                );
                if removed > 0 {
                    trace!(window = window.0, removed, "collapsed pending resize");
                }
                queue.push(Event::VideoResize {
                    window,
                    w: data1,
                    h: data2,
                });
            }
            WindowEventKind::Exposed => {
                queue.remove_where(|e| matches!(e, Event::VideoExpose { window: w } if *w == window));
                queue.push(Event::VideoExpose { window });
            }
            _ => {
                if let Some((gain, state)) = active_change(kind) {
                    queue.push(Event::Active { gain, state });
                }
            }
        }
    }

    /// Drop all pipeline state: armed timer, pending ticks and cached text.
    pub fn reset(&mut self) {
        self.cancel_repeat();
        while self.fire_rx.try_recv().is_ok() {}
        self.awaiting_text = None;
        self.text.clear();
    }
}

fn active_change(kind: WindowEventKind) -> Option<(bool, ActiveState)> {
    match kind {
        WindowEventKind::Enter => Some((true, ActiveState::MouseFocus)),
        WindowEventKind::Leave => Some((false, ActiveState::MouseFocus)),
        WindowEventKind::FocusGained => Some((true, ActiveState::InputFocus)),
        WindowEventKind::FocusLost => Some((false, ActiveState::InputFocus)),
        WindowEventKind::Minimized => Some((false, ActiveState::AppActive)),
        WindowEventKind::Restored => Some((true, ActiveState::AppActive)),
        _ => None,
    }
}

/// Native side buttons arrive as 4 and 5; shift them past the wheel indices.
fn remap_button(mut event: MouseButtonEvent) -> MouseButtonEvent {
    if event.origin == ButtonOrigin::Native && event.button >= button::WHEEL_UP {
        event.button += button::X1 - button::WHEEL_UP;
    }
    event
}

fn push_wheel_clicks(wheel: &MouseWheelEvent, pointer: (i32, i32), queue: &mut EventQueue) {
    let index = if wheel.y > 0 {
        button::WHEEL_UP
    } else {
        button::WHEEL_DOWN
    };
    let click = MouseButtonEvent {
        window: wheel.window,
        which: wheel.which,
        button: index,
        x: pointer.0,
        y: pointer.1,
        clicks: 1,
        origin: ButtonOrigin::Wheel,
    };
    for _ in 0..wheel.y.unsigned_abs() {
        queue.push(Event::MouseButtonDown(click.clone()));
        queue.push(Event::MouseButtonUp(click.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, KeyMods};

    const WIN: WindowId = WindowId(1);

    fn key(scancode: u32, key: char) -> KeyboardEvent {
        KeyboardEvent {
            window: WIN,
            scancode: Scancode(scancode),
            key: key as i32,
            mods: KeyMods::empty(),
            repeat: false,
        }
    }

    fn window(event: WindowEventKind, data1: i32, data2: i32) -> RawEvent {
        RawEvent::Window {
            window: WIN,
            event,
            data1,
            data2,
        }
    }

    fn run(pipeline: &mut EventPipeline, queue: &mut EventQueue, raw: RawEvent) {
        if let Some(event) = pipeline.filter(raw, queue, (0, 0)) {
            queue.push(event);
        }
    }

    #[test]
    fn test_resize_pushes_video_resize_before_original() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        run(&mut pipeline, &mut queue, window(WindowEventKind::Resized, 640, 480));

        let events = queue.drain_all();
        assert_eq!(
            events[0],
            Event::VideoResize {
                window: WIN,
                w: 640,
                h: 480
            }
        );
        assert_eq!(events[1].kind(), EventKind::Window(WindowEventKind::Resized));
    }

    #[test]
    fn test_resize_dedup_is_per_window() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        let other = RawEvent::Window {
            window: WindowId(2),
            event: WindowEventKind::Resized,
            data1: 1,
            data2: 1,
        };
        run(&mut pipeline, &mut queue, other);
        run(&mut pipeline, &mut queue, window(WindowEventKind::Resized, 10, 10));
        run(&mut pipeline, &mut queue, window(WindowEventKind::Resized, 20, 20));

        let resizes: Vec<_> = queue.drain_kinds(&[EventKind::VideoResize]);
        assert_eq!(resizes.len(), 2);
        assert!(resizes.contains(&Event::VideoResize {
            window: WIN,
            w: 20,
            h: 20
        }));
    }

    #[test]
    fn test_active_mapping() {
        let cases = [
            (WindowEventKind::Enter, true, ActiveState::MouseFocus),
            (WindowEventKind::Leave, false, ActiveState::MouseFocus),
            (WindowEventKind::FocusGained, true, ActiveState::InputFocus),
            (WindowEventKind::FocusLost, false, ActiveState::InputFocus),
            (WindowEventKind::Minimized, false, ActiveState::AppActive),
            (WindowEventKind::Restored, true, ActiveState::AppActive),
        ];
        for (kind, gain, state) in cases {
            let mut pipeline = EventPipeline::new();
            let mut queue = EventQueue::new();
            run(&mut pipeline, &mut queue, window(kind, 0, 0));
            assert_eq!(queue.pop_front(), Some(Event::Active { gain, state }));
        }
    }

    #[test]
    fn test_native_repeat_dropped() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        let mut held = key(4, 'a');
        held.repeat = true;
        assert!(pipeline.filter(RawEvent::KeyDown(held), &mut queue, (0, 0)).is_none());
    }

    #[test]
    fn test_side_buttons_shift_past_wheel() {
        let press = |button| MouseButtonEvent {
            window: WIN,
            which: 0,
            button,
            x: 0,
            y: 0,
            clicks: 1,
            origin: ButtonOrigin::Native,
        };
        assert_eq!(remap_button(press(1)).button, button::LEFT);
        assert_eq!(remap_button(press(3)).button, button::RIGHT);
        assert_eq!(remap_button(press(4)).button, button::X1);
        assert_eq!(remap_button(press(5)).button, button::X2);

        let mut wheel_click = press(button::WHEEL_DOWN);
        wheel_click.origin = ButtonOrigin::Wheel;
        assert_eq!(remap_button(wheel_click).button, button::WHEEL_DOWN);
    }

    #[test]
    fn test_wheel_down_clicks_at_pointer() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        let wheel = MouseWheelEvent {
            window: WIN,
            which: 0,
            x: 0,
            y: -1,
            flipped: false,
        };
        let passed = pipeline.filter(RawEvent::MouseWheel(wheel), &mut queue, (12, 34));
        assert!(matches!(passed, Some(Event::MouseWheel(_))));

        let events = queue.drain_all();
        assert_eq!(events.len(), 2);
        match &events[0] {
            Event::MouseButtonDown(click) => {
                assert_eq!(click.button, button::WHEEL_DOWN);
                assert_eq!((click.x, click.y), (12, 34));
                assert_eq!(click.origin, ButtonOrigin::Wheel);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_horizontal_wheel_passes_without_clicks() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        let wheel = MouseWheelEvent {
            window: WIN,
            which: 0,
            x: 3,
            y: 0,
            flipped: false,
        };
        assert!(pipeline
            .filter(RawEvent::MouseWheel(wheel), &mut queue, (0, 0))
            .is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_text_attributed_to_last_keydown() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        let down = key(4, 'a');
        run(&mut pipeline, &mut queue, RawEvent::KeyDown(down.clone()));
        run(
            &mut pipeline,
            &mut queue,
            RawEvent::TextInput {
                window: WIN,
                text: "ä".to_string(),
            },
        );
        // a second text event has no key-down to attach to
        run(
            &mut pipeline,
            &mut queue,
            RawEvent::TextInput {
                window: WIN,
                text: "x".to_string(),
            },
        );

        let events = queue.drain_all();
        match &events[0] {
            Event::KeyDown(press) => assert_eq!(press.unicode(), "ä"),
            other => panic!("unexpected {:?}", other),
        }

        let released = pipeline.filter(RawEvent::KeyUp(down.clone()), &mut queue, (0, 0));
        match released {
            Some(Event::KeyUp(press)) => assert_eq!(press.text.as_deref(), Some("ä")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(pipeline.text.is_empty());
    }

    #[test]
    fn test_unread_keyup_still_clears_text() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        queue.set_blocked(EventKind::KeyUp, true);
        let down = key(4, 'a');
        run(&mut pipeline, &mut queue, RawEvent::KeyDown(down.clone()));
        run(
            &mut pipeline,
            &mut queue,
            RawEvent::TextInput {
                window: WIN,
                text: "ä".to_string(),
            },
        );
        run(&mut pipeline, &mut queue, RawEvent::KeyUp(down.clone()));
        queue.clear();

        let mut chord = down;
        chord.mods = KeyMods::LCTRL;
        run(&mut pipeline, &mut queue, RawEvent::KeyDown(chord));
        match queue.pop_front() {
            Some(Event::KeyDown(press)) => {
                assert_eq!(press.text, None);
                assert_eq!(press.unicode(), "\u{1}");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keyup_clears_pending_attribution() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        run(&mut pipeline, &mut queue, RawEvent::KeyDown(key(4, 'a')));
        run(&mut pipeline, &mut queue, RawEvent::KeyUp(key(4, 'a')));
        run(
            &mut pipeline,
            &mut queue,
            RawEvent::TextInput {
                window: WIN,
                text: "late".to_string(),
            },
        );
        assert!(pipeline.text.is_empty());
        match queue.pop_front() {
            Some(Event::KeyDown(press)) => assert_eq!(press.text, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_set_repeat_validation() {
        let mut pipeline = EventPipeline::new();
        assert!(matches!(pipeline.set_repeat(-1, 0), Err(Error::Configuration(_))));
        assert!(matches!(pipeline.set_repeat(10, -5), Err(Error::Configuration(_))));
        assert_eq!(pipeline.repeat(), (0, 0));

        pipeline.set_repeat(100, 0).unwrap();
        assert_eq!(pipeline.repeat(), (100, 100));
        pipeline.set_repeat(0, 0).unwrap();
        assert_eq!(pipeline.repeat(), (0, 0));
    }

    #[test]
    fn test_keyup_for_other_key_keeps_timer() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        pipeline.set_repeat(500, 50).unwrap();
        run(&mut pipeline, &mut queue, RawEvent::KeyDown(key(4, 'a')));
        assert!(pipeline.repeat_armed());

        run(&mut pipeline, &mut queue, RawEvent::KeyUp(key(5, 'b')));
        assert!(pipeline.repeat_armed());

        run(&mut pipeline, &mut queue, RawEvent::KeyUp(key(4, 'a')));
        assert!(!pipeline.repeat_armed());
    }

    #[test]
    fn test_repeat_fires_become_keydowns() {
        let mut pipeline = EventPipeline::new();
        let mut queue = EventQueue::new();
        pipeline.set_repeat(5, 5).unwrap();
        run(&mut pipeline, &mut queue, RawEvent::KeyDown(key(4, 'a')));

        let mut repeats = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while repeats.is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            repeats = pipeline.drain_repeats();
        }
        match repeats.first() {
            Some(Event::KeyDown(press)) => {
                assert!(press.key.repeat);
                assert_eq!(press.key.scancode, Scancode(4));
            }
            other => panic!("expected a repeat key-down, got {:?}", other),
        }

        pipeline.reset();
        assert!(!pipeline.repeat_armed());
        assert!(pipeline.drain_repeats().is_empty());
    }
}
