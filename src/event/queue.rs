// Application event queue with per-kind blocking

use std::collections::{HashSet, VecDeque};

use tracing::{trace, warn};

use super::{Event, EventKind};

/// Maximum number of events held at once; further pushes are dropped.
pub const MAX_QUEUED_EVENTS: usize = 65535;

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    blocked: HashSet<EventKind>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Returns false if its kind is blocked or the queue is full.
    pub fn push(&mut self, event: Event) -> bool {
        let kind = event.kind();
        if self.blocked.contains(&kind) {
            trace!(kind = kind.name(), "dropping blocked event");
            return false;
        }
        if self.events.len() >= MAX_QUEUED_EVENTS {
            warn!(kind = kind.name(), "event queue full, dropping event");
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Remove every pending event matching `pred`, returning how many went.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Event) -> bool) -> usize {
        let before = self.events.len();
        self.events.retain(|event| !pred(event));
        before - self.events.len()
    }

    pub fn pop_front(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn drain_all(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Take the events whose kind is in `kinds`, leaving the rest queued in order.
    pub fn drain_kinds(&mut self, kinds: &[EventKind]) -> Vec<Event> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.events.len());
        for event in self.events.drain(..) {
            if kinds.contains(&event.kind()) {
                taken.push(event);
            } else {
                kept.push_back(event);
            }
        }
        self.events = kept;
        taken
    }

    pub fn contains_kind(&self, kinds: &[EventKind]) -> bool {
        self.events.iter().any(|event| kinds.contains(&event.kind()))
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn set_blocked(&mut self, kind: EventKind, blocked: bool) {
        if blocked {
            self.blocked.insert(kind);
            self.events.retain(|event| event.kind() != kind);
        } else {
            self.blocked.remove(&kind);
        }
    }

    pub fn is_blocked(&self, kind: EventKind) -> bool {
        self.blocked.contains(&kind)
    }

    pub fn clear_blocked(&mut self) {
        self.blocked.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Most recently queued event matching `pred`
    pub fn last_mut_where(&mut self, mut pred: impl FnMut(&Event) -> bool) -> Option<&mut Event> {
        self.events.iter_mut().rev().find(|event| pred(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::WindowId;

    fn resize(window: u32, w: i32) -> Event {
        Event::VideoResize {
            window: WindowId(window),
            w,
            h: 10,
        }
    }

    #[test]
    fn test_blocked_kind_is_not_queued() {
        let mut queue = EventQueue::new();
        queue.set_blocked(EventKind::Quit, true);
        assert!(!queue.push(Event::Quit));
        assert!(queue.is_empty());

        queue.set_blocked(EventKind::Quit, false);
        assert!(queue.push(Event::Quit));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_blocking_purges_pending() {
        let mut queue = EventQueue::new();
        queue.push(Event::Quit);
        queue.push(resize(1, 5));
        queue.set_blocked(EventKind::Quit, true);
        assert_eq!(queue.drain_all(), vec![resize(1, 5)]);
    }

    #[test]
    fn test_remove_where_and_drain_kinds() {
        let mut queue = EventQueue::new();
        queue.push(resize(1, 1));
        queue.push(Event::Quit);
        queue.push(resize(2, 2));

        assert_eq!(
            queue.remove_where(|e| matches!(e, Event::VideoResize { window, .. } if *window == WindowId(1))),
            1
        );
        assert!(queue.contains_kind(&[EventKind::Quit]));
        assert_eq!(queue.drain_kinds(&[EventKind::Quit]), vec![Event::Quit]);
        assert_eq!(queue.drain_all(), vec![resize(2, 2)]);
    }

    #[test]
    fn test_capacity_bound() {
        let mut queue = EventQueue::new();
        for _ in 0..MAX_QUEUED_EVENTS {
            assert!(queue.push(Event::Quit));
        }
        assert!(!queue.push(Event::Quit));
        assert_eq!(queue.len(), MAX_QUEUED_EVENTS);
    }
}
