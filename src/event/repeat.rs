// Key-repeat timer
//
// Each armed timer runs on its own thread. It waits on a cancel channel
// with a timeout and, when the timeout elapses, sends an owned copy of the
// template key-down back to the pipeline. Dropping the timer drops the
// cancel sender, which wakes the thread and ends it.

use std::thread;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{trace, warn};

use super::KeyboardEvent;

/// One repeat tick produced by a timer thread
#[derive(Debug, Clone)]
pub struct RepeatFire {
    pub generation: u64,
    pub key: KeyboardEvent,
}

pub struct RepeatTimer {
    generation: u64,
    template: KeyboardEvent,
    // held only so that dropping the timer disconnects the thread
    _cancel: Sender<()>,
}

impl RepeatTimer {
    /// Start a timer that fires after `delay`, then every `interval`.
    ///
    /// A zero interval fires once. Returns None if the thread could not be
    /// spawned; key repeat is then skipped for this press.
    pub fn arm(
        generation: u64,
        template: KeyboardEvent,
        delay: Duration,
        interval: Duration,
        fires: Sender<RepeatFire>,
    ) -> Option<Self> {
        let (cancel_tx, cancel_rx) = flume::bounded::<()>(1);
        let snapshot = template.clone();

        let spawned = thread::Builder::new()
            .name("pgcompat-key-repeat".to_string())
            .spawn(move || run_timer(generation, snapshot, delay, interval, cancel_rx, fires));

        match spawned {
            Ok(_) => {
                trace!(generation, scancode = template.scancode.0, "key repeat armed");
                Some(Self {
                    generation,
                    template,
                    _cancel: cancel_tx,
                })
            }
            Err(e) => {
                warn!("Failed to spawn key repeat thread: {}", e);
                None
            }
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn template(&self) -> &KeyboardEvent {
        &self.template
    }
}

fn run_timer(
    generation: u64,
    template: KeyboardEvent,
    delay: Duration,
    interval: Duration,
    cancel: Receiver<()>,
    fires: Sender<RepeatFire>,
) {
    let mut wait = delay;
    loop {
        match cancel.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                let fire = RepeatFire {
                    generation,
                    key: template.clone(),
                };
                if fires.send(fire).is_err() || interval.is_zero() {
                    return;
                }
                wait = interval;
            }
            // cancelled, or the timer was dropped
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyMods, Scancode};
    use crate::platform::WindowId;

    fn key() -> KeyboardEvent {
        KeyboardEvent {
            window: WindowId(1),
            scancode: Scancode(4),
            key: b'a' as i32,
            mods: KeyMods::empty(),
            repeat: false,
        }
    }

    #[test]
    fn test_timer_fires_with_generation() {
        let (tx, rx) = flume::unbounded();
        let timer = RepeatTimer::arm(7, key(), Duration::from_millis(5), Duration::ZERO, tx)
            .expect("spawn timer");
        let fire = rx.recv_timeout(Duration::from_secs(2)).expect("fire");
        assert_eq!(fire.generation, 7);
        assert_eq!(fire.key, key());
        assert_eq!(timer.generation(), 7);
    }

    #[test]
    fn test_dropped_timer_never_fires() {
        let (tx, rx) = flume::unbounded();
        let timer = RepeatTimer::arm(1, key(), Duration::from_millis(200), Duration::ZERO, tx)
            .expect("spawn timer");
        drop(timer);
        assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
    }
}
