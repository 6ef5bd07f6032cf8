//! Progress clock for playback sessions.
//!
//! Ticks on a background thread, reporting elapsed playback time to
//! observers and firing a one-shot finish signal when the end of the
//! recording is reached. Each `run` belongs to an epoch; bumping the
//! epoch (via `stop` or a new `run`) makes every tick and the pending
//! finish of the old run a no-op, so there is never more than one live
//! tick source and never a stale callback mutating state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::player::subscribers::{Subscribers, Subscription};

/// One clock tick: how far into the recording playback is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub current_ms: u64,
    pub total_ms: u64,
}

/// Wall-clock-driven ticking primitive.
pub struct ProgressClock {
    total_ms: u64,
    tick_interval: Duration,
    epoch: Arc<AtomicU64>,
    update_subs: Subscribers<Tick>,
    finish_subs: Subscribers<()>,
}

impl ProgressClock {
    pub fn new(total_ms: u64, tick_interval: Duration) -> Self {
        Self {
            total_ms,
            tick_interval,
            epoch: Arc::new(AtomicU64::new(0)),
            update_subs: Subscribers::new(),
            finish_subs: Subscribers::new(),
        }
    }

    /// Observer invoked on every tick.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn on_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Tick) + Send + Sync + 'static,
    {
        self.update_subs.subscribe(callback)
    }

    /// Observer invoked once per run when the clock reaches the total.
    /// Disabled for a run once `stop` has been called.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn on_finish<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.finish_subs.subscribe(callback)
    }

    /// Start ticking from `start_offset_ms` into the recording.
    ///
    /// Any previous run is invalidated first; its thread exits on its next
    /// wakeup without emitting anything further.
    pub fn run(&self, start_offset_ms: u64) {
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let epoch = Arc::clone(&self.epoch);
        let update_subs = self.update_subs.clone();
        let finish_subs = self.finish_subs.clone();
        let total_ms = self.total_ms;
        let tick_interval = self.tick_interval;
        let started = Instant::now();

        thread::spawn(move || loop {
            thread::sleep(tick_interval);
            if epoch.load(Ordering::SeqCst) != my_epoch {
                return;
            }

            let elapsed = started.elapsed().as_millis() as u64;
            let current_ms = (start_offset_ms + elapsed).min(total_ms);
            update_subs.emit(&Tick {
                current_ms,
                total_ms,
            });

            if current_ms >= total_ms {
                // Transition to stopped atomically so a racing stop()
                // cannot let finish fire twice or after cancellation.
                if epoch
                    .compare_exchange(my_epoch, my_epoch + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    finish_subs.emit(&());
                }
                return;
            }
        });
    }

    /// Halt ticking. Idempotent; also cancels the pending finish of the
    /// current run.
    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }
}

impl Drop for ProgressClock {
    fn drop(&mut self) {
        self.stop();
    }
}
