//! Playback session bookkeeping.
//!
//! `SessionState` is the single source of truth for "where we are" in a
//! recording: a cumulative relative time that only advances while
//! playing, plus the wall-clock origin of the current playing segment.
//! Elapsed time is always computed on demand from these two fields, never
//! cached, so repeated pause/resume cycles cannot drift.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Session-state notification published to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub playing: bool,
    pub session_active: bool,
}

/// Relative-time bookkeeping for one playback session.
///
/// Invariant: `segment_origin` is `Some` exactly while `playing`.
#[derive(Debug, Clone)]
pub struct SessionState {
    relative_active_time: Duration,
    segment_origin: Option<Instant>,
    playing: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            relative_active_time: Duration::ZERO,
            segment_origin: None,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Frozen relative time. Only meaningful while paused; while playing
    /// use `elapsed`.
    pub fn relative(&self) -> Duration {
        self.relative_active_time
    }

    /// Elapsed playback time as of `now`: the frozen relative time plus
    /// the current segment's wall-clock age while playing.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.segment_origin {
            Some(origin) => self.relative_active_time + now.duration_since(origin),
            None => self.relative_active_time,
        }
    }

    /// Re-anchor the relative time, e.g. after a seek. Only valid while
    /// paused, when relative time is frozen.
    pub fn set_offset(&mut self, offset: Duration) {
        debug_assert!(!self.playing, "set_offset during a playing segment");
        self.relative_active_time = offset;
    }

    /// Begin a playing segment anchored at `now`.
    pub fn begin_segment(&mut self, now: Instant) {
        self.segment_origin = Some(now);
        self.playing = true;
    }

    /// End the current segment, folding its wall-clock age into the
    /// relative time exactly once, clamped to `cap`. No-op when already
    /// paused.
    pub fn freeze(&mut self, now: Instant, cap: Duration) {
        if let Some(origin) = self.segment_origin.take() {
            self.relative_active_time =
                (self.relative_active_time + now.duration_since(origin)).min(cap);
        }
        self.playing = false;
    }

    /// Reset to the initial state for a fresh session.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// One-shot completion handle, resolved when a session closes.
///
/// Cloneable; any clone may resolve or wait. Resolving more than once is
/// harmless.
#[derive(Clone, Default)]
pub struct CloseSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session closed and wake all waiters. Idempotent.
    pub fn resolve(&self) {
        let (lock, cvar) = &*self.inner;
        let mut resolved = lock.lock().expect("close signal poisoned");
        *resolved = true;
        cvar.notify_all();
    }

    /// Block until the session closes.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut resolved = lock.lock().expect("close signal poisoned");
        while !*resolved {
            resolved = cvar.wait(resolved).expect("close signal poisoned");
        }
    }

    /// Block until the session closes or `timeout` passes; returns
    /// whether it closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.inner;
        let mut resolved = lock.lock().expect("close signal poisoned");
        while !*resolved {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = cvar
                .wait_timeout(resolved, deadline - now)
                .expect("close signal poisoned");
            resolved = guard;
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        *self.inner.0.lock().expect("close signal poisoned")
    }
}

impl std::fmt::Debug for CloseSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseSignal")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
