//! Action replayer.
//!
//! Reconstructs editor state at an arbitrary offset and schedules the
//! remaining actions to fire at their recorded delays. Seeking never
//! undoes anything: `move_to_frame` always resets to the workspace
//! snapshot and replays forward, which is what makes reconstruction
//! deterministic for both directions.
//!
//! Scheduling uses the same epoch discipline as the progress clock: a
//! schedule belongs to the epoch it was started under, `pause` bumps the
//! epoch, and a worker that wakes up under a stale epoch applies nothing
//! further. At most one schedule is ever outstanding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::library::WorkspaceSnapshot;
use crate::player::editor::EditorBackend;
use crate::timeline::{Action, Timeline};

/// Worker wakeup granularity; bounds how long a cancelled schedule can
/// keep sleeping.
const CANCEL_POLL: Duration = Duration::from_millis(25);

pub struct Replayer {
    timeline: Timeline,
    snapshot: WorkspaceSnapshot,
    editor: Arc<Mutex<dyn EditorBackend>>,
    epoch: Arc<AtomicU64>,
}

impl Replayer {
    pub fn new(
        timeline: Timeline,
        snapshot: WorkspaceSnapshot,
        editor: Arc<Mutex<dyn EditorBackend>>,
    ) -> Self {
        Self {
            timeline,
            snapshot,
            editor,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Deterministically reconstruct the editor state at `offset_ms`.
    ///
    /// Resets to the snapshot, then applies every action with
    /// `timestamp <= offset_ms` in replay order. Safe for forward and
    /// backward jumps alike. Blocks until reconstruction settles; the
    /// coordinator serializes callers, so no two replays ever overlap.
    pub fn move_to_frame(&self, offset_ms: u64) {
        let mut editor = self.editor.lock().expect("editor backend poisoned");
        if let Err(err) = editor.reset(&self.snapshot) {
            warn!(error = %err, "snapshot reset failed, replaying onto current state");
        }
        let actions = self.timeline.actions_until(offset_ms);
        debug!(offset_ms, count = actions.len(), "reconstructing frame");
        for action in actions {
            if let Err(err) = editor.apply(action) {
                // Atomic per action: a failed one is skipped whole.
                warn!(
                    timestamp_ms = action.timestamp_ms,
                    kind = action.payload.kind(),
                    error = %err,
                    "skipping unplayable action during reconstruction"
                );
            }
        }
    }

    /// Actions still pending when playback resumes from `offset_ms`,
    /// excluding anything recorded past the timeline's duration.
    pub fn pending_from(&self, offset_ms: u64) -> Vec<Action> {
        self.timeline.actions_after(offset_ms)
    }

    /// Schedule `actions` to fire at `start + (timestamp - offset_ms)`.
    ///
    /// `actions` must be in replay order with timestamps `> offset_ms`;
    /// `pending_from` produces exactly that. Any previous schedule is
    /// cancelled first.
    pub fn play(&self, actions: Vec<Action>, offset_ms: u64) {
        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if actions.is_empty() {
            return;
        }

        let epoch = Arc::clone(&self.epoch);
        let editor = Arc::clone(&self.editor);
        let start = Instant::now();

        thread::spawn(move || {
            for action in actions {
                let due = Duration::from_millis(action.timestamp_ms - offset_ms);
                loop {
                    if epoch.load(Ordering::SeqCst) != my_epoch {
                        return;
                    }
                    let remaining = due.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        break;
                    }
                    thread::sleep(remaining.min(CANCEL_POLL));
                }
                if epoch.load(Ordering::SeqCst) != my_epoch {
                    return;
                }

                let mut editor = editor.lock().expect("editor backend poisoned");
                if let Err(err) = editor.apply(&action) {
                    warn!(
                        timestamp_ms = action.timestamp_ms,
                        kind = action.payload.kind(),
                        error = %err,
                        "skipping unplayable action"
                    );
                }
            }
        });
    }

    /// Cancel all pending scheduled actions. Applied state is retained;
    /// resuming recomputes the pending list from the paused offset.
    pub fn pause(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }
}

impl Drop for Replayer {
    fn drop(&mut self) {
        self.pause();
    }
}
