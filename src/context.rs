// Context: the single owner of backend, display state, pipeline and queue
//
// Every operation that mutates display or event state takes `&mut self`,
// so there is exactly one mutator at a time.

use tracing::{debug, info, trace};

use crate::display::{self, DisplayState, ModeRequest, Surface};
use crate::error::{Error, Result};
use crate::event::facade::record_from_event;
use crate::event::{Event, EventKind, EventPipeline, EventQueue, EventRecord, RawEvent};
use crate::platform::{Icon, InputBackend, VideoBackend, WindowId};

pub struct Context<V: VideoBackend, I: InputBackend> {
    video: V,
    input: I,
    display: DisplayState,
    pipeline: EventPipeline,
    queue: EventQueue,
}

impl<V: VideoBackend, I: InputBackend> Context<V, I> {
    pub fn new(video: V, input: I) -> Self {
        Self {
            video,
            input,
            display: DisplayState::default(),
            pipeline: EventPipeline::new(),
            queue: EventQueue::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn window(&self) -> Option<WindowId> {
        self.display.window()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn init(&mut self) -> Result<()> {
        if !self.video.was_init() {
            self.video.init()?;
            info!("video initialized");
        }
        Ok(())
    }

    pub fn get_init(&self) -> bool {
        self.video.was_init()
    }

    /// Tear down the display, drop pending events and shut video down
    pub fn quit(&mut self) {
        self.display.teardown(&mut self.video);
        self.pipeline.reset();
        self.queue.clear();
        if self.video.was_init() {
            self.video.quit();
            info!("video shut down");
        }
    }

    fn require_init(&self) -> Result<()> {
        if self.video.was_init() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Configure the display and return the drawable surface.
    ///
    /// The returned handle is the same object on every call; it is rebound
    /// to the new native surface in place.
    pub fn set_mode(&mut self, request: &ModeRequest) -> Result<Surface> {
        let surface = display::set_mode(&mut self.video, &mut self.display, request)?;
        self.pump()?;
        Ok(surface)
    }

    pub fn get_surface(&self) -> Option<Surface> {
        self.display.surface().cloned()
    }

    pub fn get_window_size(&self) -> Result<(i32, i32)> {
        self.display.window_size(&self.video)
    }

    pub fn set_caption(&mut self, title: &str) {
        self.display.set_caption(&mut self.video, title);
    }

    pub fn get_caption(&self) -> &str {
        self.display.caption()
    }

    pub fn set_icon(&mut self, icon: Icon) {
        self.display.set_icon(&mut self.video, icon);
    }

    /// Returns false if the window system rejected the ramp
    pub fn set_gamma_ramp(&mut self, red: &[u16], green: &[u16], blue: &[u16]) -> Result<bool> {
        self.display
            .set_gamma_ramp(&mut self.video, red, green, blue)
    }

    pub fn flip(&mut self) -> Result<()> {
        self.require_init()?;
        self.display.flip(&mut self.video)
    }

    pub fn iconify(&mut self) -> Result<()> {
        self.require_init()?;
        self.display.iconify(&mut self.video)
    }

    pub fn get_active(&self) -> bool {
        self.display.is_active(&self.video)
    }

    pub fn set_auto_resize(&mut self, enabled: bool) {
        self.display.set_auto_resize(enabled);
    }

    pub fn get_auto_resize(&self) -> bool {
        self.display.auto_resize()
    }

    pub fn get_num_displays(&self) -> Result<i32> {
        self.require_init()?;
        Ok(self.video.num_displays()?)
    }

    pub fn get_desktop_sizes(&self) -> Result<Vec<(i32, i32)>> {
        self.require_init()?;
        display::desktop_sizes(&self.video)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Move pending raw events and repeat ticks through the pipeline into the queue
    pub fn pump(&mut self) -> Result<()> {
        self.require_init()?;

        for repeat in self.pipeline.drain_repeats() {
            self.queue.push(repeat);
        }

        while let Some(raw) = self.input.poll_event() {
            trace!(?raw, "raw event");
            let watched = match &raw {
                RawEvent::Window {
                    window,
                    event,
                    data1,
                    data2,
                } => Some((*window, *event, *data1, *data2)),
                _ => None,
            };

            let pointer = self.input.pointer_position();
            if let Some(event) = self.pipeline.filter(raw, &mut self.queue, pointer) {
                self.queue.push(event);
            }

            if let Some((window, kind, data1, data2)) = watched {
                display::on_window_event(
                    &mut self.video,
                    &mut self.display,
                    window,
                    kind,
                    data1,
                    data2,
                );
            }
        }
        Ok(())
    }

    /// Pump, then take every queued event
    pub fn get(&mut self) -> Result<Vec<EventRecord>> {
        self.pump()?;
        Ok(records(self.queue.drain_all()))
    }

    /// Pump, then take only events of the given kinds; others stay queued
    pub fn get_kinds(&mut self, kinds: &[EventKind]) -> Result<Vec<EventRecord>> {
        self.pump()?;
        Ok(records(self.queue.drain_kinds(kinds)))
    }

    /// Pump, then take the oldest queued event
    pub fn poll(&mut self) -> Result<Option<EventRecord>> {
        self.pump()?;
        Ok(self
            .queue
            .pop_front()
            .map(record_from_event))
    }

    /// Pump, then report whether any event of the given kinds is queued
    pub fn peek(&mut self, kinds: &[EventKind]) -> Result<bool> {
        self.pump()?;
        Ok(self.queue.contains_kind(kinds))
    }

    /// Pump, then discard queued events (all of them when `kinds` is empty)
    pub fn clear(&mut self, kinds: &[EventKind]) -> Result<()> {
        self.pump()?;
        if kinds.is_empty() {
            self.queue.clear();
        } else {
            self.queue.drain_kinds(kinds);
        }
        Ok(())
    }

    /// Queue an application event. Returns false if its kind is blocked.
    pub fn post(&mut self, record: EventRecord) -> Result<bool> {
        self.require_init()?;
        Ok(self.queue.push(Event::Posted(record)))
    }

    pub fn set_blocked(&mut self, kinds: &[EventKind]) {
        for kind in kinds {
            self.queue.set_blocked(*kind, true);
        }
        debug!(?kinds, "event kinds blocked");
    }

    pub fn set_allowed(&mut self, kinds: &[EventKind]) {
        for kind in kinds {
            self.queue.set_blocked(*kind, false);
        }
    }

    /// Allow every kind again
    pub fn allow_all(&mut self) {
        self.queue.clear_blocked();
    }

    pub fn get_blocked(&self, kind: EventKind) -> bool {
        self.queue.is_blocked(kind)
    }

    /// Key repeat delay and interval in milliseconds; zero delay disables it
    pub fn set_repeat(&mut self, delay: i32, interval: i32) -> Result<()> {
        self.pipeline.set_repeat(delay, interval)
    }

    pub fn get_repeat(&self) -> (u32, u32) {
        self.pipeline.repeat()
    }
}

fn records(events: Vec<Event>) -> Vec<EventRecord> {
    events.into_iter().map(record_from_event).collect()
}

impl<V: VideoBackend, I: InputBackend> Drop for Context<V, I> {
    fn drop(&mut self) {
        self.quit();
    }
}
