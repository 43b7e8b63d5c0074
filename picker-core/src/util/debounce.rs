//!  src/util/debounce.rs
//!  ===================================================================
//!  Trailing-edge debouncer for filter keystrokes
//!
//!  • Every submit cancels the pending sleeper and arms a fresh one, so
//!    only the last value of a burst is forwarded.
//!  • A zero delay forwards synchronously; nothing is spawned.
//!  • Output is an unbounded channel the host loop `select!`s on.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, trace};

/// Latest submitted value, tagged with the submit that armed it.
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

impl<T> Slot<T> {
    /// Takes the value only if no later submit re-armed the slot.
    fn take_if_current(&mut self, generation: u64) -> Option<T> {
        if self.generation == generation {
            self.value.take()
        } else {
            None
        }
    }

    /// Invalidates every armed sleeper and returns the pending value.
    fn disarm(&mut self) -> Option<T> {
        self.generation += 1;
        self.value.take()
    }
}

pub struct Debouncer<T> {
    delay: Duration,
    slot: Arc<Mutex<Slot<T>>>,
    sleeper: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a new debouncer and its Rx endpoint
    #[must_use]
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let deb = Self {
            delay,
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                value: None,
            })),
            sleeper: None,
            tx,
        };
        (deb, rx)
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().value.is_some()
    }

    /// Submit a value; it is forwarded once `delay` passes without another
    /// submit. Must be called inside a tokio runtime unless the delay is zero.
    pub fn submit(&mut self, ev: T) {
        self.abort_sleeper();

        if self.delay.is_zero() {
            self.slot.lock().disarm();
            let _ = self.tx.send(ev);
            return;
        }

        trace!(delay_ms = self.delay.as_millis() as u64, "Debounce armed");
        let generation = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            slot.value = Some(ev);
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let tx = self.tx.clone();
        let delay = self.delay;

        self.sleeper = Some(tokio::spawn(async move {
            sleep(delay).await;

            // abort() cannot stop a sleeper that already woke up
            let event = slot.lock().take_if_current(generation);
            if let Some(event) = event {
                debug!("Debounce fired");
                let _ = tx.send(event);
            }
        }));
    }

    /// Forward the pending value now, if any.
    pub fn flush(&mut self) {
        self.abort_sleeper();

        let event = self.slot.lock().disarm();
        if let Some(event) = event {
            let _ = self.tx.send(event);
        }
    }

    /// Drop the pending value without forwarding it.
    pub fn cancel(&mut self) {
        self.abort_sleeper();
        self.slot.lock().disarm();
    }

    fn abort_sleeper(&mut self) {
        if let Some(handle) = self.sleeper.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.sleeper.take() {
            handle.abort();
        }
    }
}
