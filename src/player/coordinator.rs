//! Playback coordinator.
//!
//! Owns one playback session and keeps its three channels — scheduled
//! editor actions, narration audio, and the progress clock — in lock-step
//! across play, pause, resume and seeks. All public operations serialize
//! on a single session mutex and complete before returning, so no two
//! commands ever run concurrently against the same session and callers
//! can sequence them safely.
//!
//! Relative time is the coordinator's single source of truth for "where
//! we are". Every transition folds the current segment's wall-clock age
//! into it exactly once before anchoring a new segment, which is what
//! keeps repeated pause/resume cycles drift-free.

use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::library::Codio;
use crate::player::audio::AudioChannel;
use crate::player::clock::{ProgressClock, Tick};
use crate::player::editor::EditorBackend;
use crate::player::replayer::Replayer;
use crate::player::session::{CloseSignal, SessionState, StateChange};
use crate::player::subscribers::{Subscribers, Subscription};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Point-in-time view of the session for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStatus {
    pub playing: bool,
    pub session_active: bool,
    /// Current playback position, computed on demand.
    pub position: Duration,
    pub duration: Duration,
}

/// The playback coordinator. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    editor: Arc<Mutex<dyn EditorBackend>>,
    tick_interval: Duration,
    session: Mutex<Option<LoadedSession>>,
    state_subs: Subscribers<StateChange>,
    tick_subs: Subscribers<Tick>,
}

/// Everything bound to one loaded codio. Dropped (or replaced) only by
/// the next `load`; `close` keeps the codio loaded.
struct LoadedSession {
    codio: Codio,
    replayer: Replayer,
    clock: ProgressClock,
    audio: Box<dyn AudioChannel>,
    state: SessionState,
    close: CloseSignal,
    session_active: bool,
    // Keeps the clock-to-coordinator wiring alive for the session.
    _clock_subs: Vec<Subscription>,
}

impl Player {
    pub fn new(editor: Arc<Mutex<dyn EditorBackend>>) -> Self {
        Self::with_tick_interval(editor, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_tick_interval(
        editor: Arc<Mutex<dyn EditorBackend>>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PlayerInner {
                editor,
                tick_interval,
                session: Mutex::new(None),
                state_subs: Subscribers::new(),
                tick_subs: Subscribers::new(),
            }),
        }
    }

    /// Load a codio from an unpacked directory.
    ///
    /// On failure nothing changes: any previously loaded session stays
    /// as it was and no partial session is exposed. The caller reports
    /// the error to the user.
    pub fn load(&self, dir: &Path, audio: Box<dyn AudioChannel>) -> Result<()> {
        let codio = Codio::load(dir)?;
        self.load_codio(codio, audio);
        Ok(())
    }

    /// Bind a fresh session to an already-resolved codio.
    pub fn load_codio(&self, codio: Codio, audio: Box<dyn AudioChannel>) {
        let clock = ProgressClock::new(codio.duration_ms(), self.inner.tick_interval);

        let mut clock_subs = Vec::with_capacity(2);
        let tick_subs = self.inner.tick_subs.clone();
        clock_subs.push(clock.on_update(move |tick| tick_subs.emit(tick)));

        // The clock finishing pauses the session at the end, ready for a
        // seek or close. The handler re-checks position under the lock: a
        // seek can land between the clock's final tick and the handler
        // running, and that seek's segment must not be frozen.
        let weak: Weak<PlayerInner> = Arc::downgrade(&self.inner);
        clock_subs.push(clock.on_finish(move |_| {
            if let Some(inner) = weak.upgrade() {
                (Player { inner }).pause_at_end();
            }
        }));

        let replayer = Replayer::new(
            codio.timeline.clone(),
            codio.snapshot.clone(),
            Arc::clone(&self.inner.editor),
        );

        let session = LoadedSession {
            codio,
            replayer,
            clock,
            audio,
            state: SessionState::new(),
            close: CloseSignal::new(),
            session_active: false,
            _clock_subs: clock_subs,
        };

        let previous = self.lock_session().replace(session);
        if let Some(mut previous) = previous {
            // Tear the old session down so nobody waits on it forever.
            previous.clock.stop();
            previous.audio.pause();
            previous.replayer.pause();
            previous.close.resolve();
        }
    }

    /// Start playback from the beginning and mark the session active.
    pub fn start(&self) -> Result<()> {
        let change = {
            let mut guard = self.lock_session();
            let session = guard.as_mut().context("no codio loaded")?;
            Self::halt_channels(session);
            session.session_active = true;
            // Restarting ends the previous session; wake anyone still
            // waiting on it before handing out the fresh signal.
            session.close.resolve();
            session.close = CloseSignal::new();
            session.state.clear();
            Self::play_from(session, Duration::ZERO);
            Self::state_change(session)
        };
        self.inner.state_subs.emit(&change);
        Ok(())
    }

    /// Pause all three channels, freezing relative time exactly once.
    /// Idempotent: pausing while paused changes nothing and notifies
    /// nobody.
    pub fn pause(&self) -> Result<()> {
        let change = {
            let mut guard = self.lock_session();
            let session = guard.as_mut().context("no codio loaded")?;
            if !session.state.is_playing() {
                return Ok(());
            }
            Self::halt_channels(session);
            Self::state_change(session)
        };
        self.inner.state_subs.emit(&change);
        Ok(())
    }

    /// Resume playback from the current relative time.
    pub fn resume(&self) -> Result<()> {
        let change = {
            let mut guard = self.lock_session();
            let session = guard.as_mut().context("no codio loaded")?;
            Self::halt_channels(session);
            let offset = session.state.relative();
            Self::play_from(session, offset);
            Self::state_change(session)
        };
        self.inner.state_subs.emit(&change);
        Ok(())
    }

    /// Jump back `secs` seconds and play from there.
    pub fn rewind(&self, secs: f64) -> Result<()> {
        self.seek_by(-(to_millis(secs) as i64))
    }

    /// Jump ahead `secs` seconds and play from there.
    pub fn forward(&self, secs: f64) -> Result<()> {
        self.seek_by(to_millis(secs) as i64)
    }

    fn seek_by(&self, delta_ms: i64) -> Result<()> {
        let change = {
            let mut guard = self.lock_session();
            let session = guard.as_mut().context("no codio loaded")?;
            Self::halt_channels(session);
            let current = session.state.relative();
            let duration = Duration::from_millis(session.codio.duration_ms());
            let target = if delta_ms >= 0 {
                (current + Duration::from_millis(delta_ms as u64)).min(duration)
            } else {
                current.saturating_sub(Duration::from_millis(delta_ms.unsigned_abs()))
            };
            debug!(
                current_ms = current.as_millis() as u64,
                target_ms = target.as_millis() as u64,
                "seeking"
            );
            Self::play_from(session, target);
            Self::state_change(session)
        };
        self.inner.state_subs.emit(&change);
        Ok(())
    }

    /// End the session: stop the clock and audio, cancel pending actions,
    /// resolve the close signal. The codio itself stays loaded.
    pub fn close(&self) -> Result<()> {
        let change = {
            let mut guard = self.lock_session();
            let session = guard.as_mut().context("no codio loaded")?;
            Self::halt_channels(session);
            session.close.resolve();
            session.session_active = false;
            Self::state_change(session)
        };
        self.inner.state_subs.emit(&change);
        Ok(())
    }

    /// Completion handle for the session started by the most recent
    /// `start`. `None` while Idle.
    pub fn closed(&self) -> Option<CloseSignal> {
        self.lock_session().as_ref().map(|s| s.close.clone())
    }

    /// Session-state notifications, for status display.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.state_subs.subscribe(callback)
    }

    /// Progress clock ticks, for progress-bar style UI.
    #[must_use = "dropping the subscription unsubscribes the observer"]
    pub fn on_tick<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Tick) + Send + Sync + 'static,
    {
        self.inner.tick_subs.subscribe(callback)
    }

    /// Current status, or `None` while no codio is loaded.
    pub fn status(&self) -> Option<PlayerStatus> {
        let guard = self.lock_session();
        guard.as_ref().map(|session| {
            let duration = Duration::from_millis(session.codio.duration_ms());
            PlayerStatus {
                playing: session.state.is_playing(),
                session_active: session.session_active,
                position: session.state.elapsed(Instant::now()).min(duration),
                duration,
            }
        })
    }

    pub fn is_playing(&self) -> bool {
        self.status().map(|s| s.playing).unwrap_or(false)
    }

    /// Current playback position, computed on demand.
    pub fn position(&self) -> Option<Duration> {
        self.status().map(|s| s.position)
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<LoadedSession>> {
        self.inner.session.lock().expect("player session poisoned")
    }

    /// Stop all three channels and freeze relative time. Safe to call
    /// while already paused.
    fn halt_channels(session: &mut LoadedSession) {
        let now = Instant::now();
        if session.state.is_playing() {
            session.replayer.pause();
            session.audio.pause();
            session.clock.stop();
            let cap = Duration::from_millis(session.codio.duration_ms());
            session.state.freeze(now, cap);
        }
    }

    /// Pause in response to the clock finishing.
    ///
    /// Re-checks under the session lock that playback is still at the
    /// end: a seek landing between the clock's final tick and this
    /// handler belongs to a newer run, and its segment stays live.
    fn pause_at_end(&self) {
        let change = {
            let mut guard = self.lock_session();
            let Some(session) = guard.as_mut() else {
                return;
            };
            let duration = Duration::from_millis(session.codio.duration_ms());
            if !session.state.is_playing()
                || session.state.elapsed(Instant::now()) < duration
            {
                return;
            }
            Self::halt_channels(session);
            Self::state_change(session)
        };
        self.inner.state_subs.emit(&change);
    }

    /// Reconstruct the frame at `offset` and set all three channels
    /// playing from it. Callers must have halted the channels first.
    ///
    /// Relative time keeps the offset at full precision; the channels
    /// work in whole milliseconds. Truncating the relative clock too
    /// would walk the position backward on every pause/resume cycle.
    fn play_from(session: &mut LoadedSession, offset: Duration) {
        let duration = Duration::from_millis(session.codio.duration_ms());
        let offset = offset.min(duration);
        let offset_ms = offset.as_millis() as u64;
        session.replayer.move_to_frame(offset_ms);
        session.state.set_offset(offset);

        let pending = session.replayer.pending_from(offset_ms);
        session.state.begin_segment(Instant::now());
        session.replayer.play(pending, offset_ms);
        if let Err(err) = session.audio.play(offset) {
            // Narration failing mid-session is not fatal; the editor
            // channels keep playing and the host sees the log.
            warn!(error = %err, "audio channel failed to start");
        }
        session.clock.run(offset_ms);
    }

    fn state_change(session: &LoadedSession) -> StateChange {
        StateChange {
            playing: session.state.is_playing(),
            session_active: session.session_active,
        }
    }
}

fn to_millis(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Metadata, WorkspaceSnapshot};
    use crate::player::audio::NullAudio;
    use crate::player::editor::VirtualEditor;
    use crate::timeline::{Action, ActionPayload, Position, Range, Timeline};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const TICK: Duration = Duration::from_millis(10);

    fn append(ts: u64, seq: u64, ch: char, col: u32) -> Action {
        Action::new(
            ts,
            seq,
            ActionPayload::TextEdit {
                path: "log.txt".to_string(),
                range: Range::at(Position::new(0, col)),
                text: ch.to_string(),
            },
        )
    }

    fn make_codio(duration_ms: u64, actions: Vec<Action>) -> Codio {
        Codio {
            dir: PathBuf::from("/nonexistent"),
            metadata: Metadata {
                id: "test".to_string(),
                name: "test".to_string(),
                length_ms: duration_ms,
                recorded_at: None,
            },
            timeline: Timeline::new(duration_ms, actions),
            snapshot: WorkspaceSnapshot::from_files([("log.txt", "")]),
            audio: PathBuf::from("/nonexistent/audio.mp3"),
        }
    }

    fn make_player(codio: Codio) -> (Player, Arc<Mutex<VirtualEditor>>) {
        let editor = Arc::new(Mutex::new(VirtualEditor::new()));
        let player = Player::with_tick_interval(editor.clone(), TICK);
        player.load_codio(codio, Box::new(NullAudio));
        (player, editor)
    }

    fn content(editor: &Arc<Mutex<VirtualEditor>>) -> String {
        editor
            .lock()
            .unwrap()
            .file_content("log.txt")
            .unwrap_or("")
            .to_string()
    }

    #[test]
    fn operations_require_a_loaded_codio() {
        let editor = Arc::new(Mutex::new(VirtualEditor::new()));
        let player = Player::new(editor);
        assert!(player.start().is_err());
        assert!(player.pause().is_err());
        assert!(player.resume().is_err());
        assert!(player.rewind(1.0).is_err());
        assert!(player.close().is_err());
        assert!(player.status().is_none());
        assert!(player.closed().is_none());
    }

    #[test]
    fn start_plays_through_and_finishes_once() {
        let codio = make_codio(
            150,
            vec![append(0, 0, 'A', 0), append(40, 1, 'B', 1), append(80, 2, 'C', 2)],
        );
        let (player, editor) = make_player(codio);

        let pauses = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&pauses);
        let _sub = player.on_state_change(move |change| {
            if !change.playing {
                p.fetch_add(1, Ordering::SeqCst);
            }
        });

        player.start().unwrap();
        assert!(player.is_playing());
        thread::sleep(Duration::from_millis(400));

        assert_eq!(content(&editor), "ABC");
        let status = player.status().unwrap();
        assert!(!status.playing);
        assert!(status.session_active, "finish pauses, it does not close");
        assert_eq!(status.position, Duration::from_millis(150));
        assert_eq!(pauses.load(Ordering::SeqCst), 1, "exactly one stop transition");
    }

    #[test]
    fn pause_resume_round_trip_preserves_position_and_state() {
        let codio = make_codio(10_000, vec![append(0, 0, 'A', 0), append(5000, 1, 'B', 1)]);
        let (player, editor) = make_player(codio);

        player.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        player.pause().unwrap();

        let paused_at = player.position().unwrap();
        let paused_content = content(&editor);
        assert!(!player.is_playing());

        player.resume().unwrap();
        assert!(player.is_playing());
        player.pause().unwrap();

        let after = player.position().unwrap();
        assert!(
            after >= paused_at && after - paused_at < Duration::from_millis(100),
            "round trip moved position from {:?} to {:?}",
            paused_at,
            after
        );
        assert_eq!(content(&editor), paused_content);
    }

    #[test]
    fn pause_while_paused_is_a_silent_no_op() {
        let codio = make_codio(10_000, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        let changes = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&changes);
        let _sub = player.on_state_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        player.start().unwrap();
        player.pause().unwrap();
        let count = changes.load(Ordering::SeqCst);
        let position = player.position().unwrap();

        player.pause().unwrap();
        player.pause().unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), count);
        assert_eq!(player.position().unwrap(), position);
    }

    #[test]
    fn immediate_rewind_clamps_to_zero() {
        // Actions at 0, 500, 1200 in a 2000ms codio: after the rewind the
        // t=0 action is applied, the rest are pending.
        let codio = make_codio(
            2000,
            vec![append(0, 0, 'A', 0), append(500, 1, 'B', 1), append(1200, 2, 'C', 2)],
        );
        let (player, editor) = make_player(codio);

        player.start().unwrap();
        player.rewind(10.0).unwrap();

        let position = player.position().unwrap();
        assert!(position < Duration::from_millis(200), "clamped to 0, got {:?}", position);
        assert!(player.is_playing());
        assert_eq!(content(&editor), "A");
        player.pause().unwrap();
    }

    #[test]
    fn forward_past_end_clamps_to_duration_exactly() {
        let codio = make_codio(2000, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        player.start().unwrap();
        player.pause().unwrap();
        player.forward(60.0).unwrap();
        thread::sleep(Duration::from_millis(100));

        let status = player.status().unwrap();
        assert_eq!(status.position, Duration::from_millis(2000));
        assert!(!status.playing, "clock finishes immediately at the end");
    }

    #[test]
    fn forward_then_rewind_returns_to_start_position() {
        let codio = make_codio(60_000, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        player.start().unwrap();
        thread::sleep(Duration::from_millis(40));
        player.pause().unwrap();
        let origin = player.position().unwrap();

        player.forward(5.0).unwrap();
        player.rewind(5.0).unwrap();
        player.pause().unwrap();

        let after = player.position().unwrap();
        let drift = if after > origin { after - origin } else { origin - after };
        assert!(drift < Duration::from_millis(150), "drift was {:?}", drift);
    }

    #[test]
    fn seek_replays_each_action_exactly_once() {
        // Pause at 700ms, resume: only the t=1200 action may fire again.
        let codio = make_codio(
            2000,
            vec![append(0, 0, 'A', 0), append(500, 1, 'B', 1), append(1200, 2, 'C', 2)],
        );
        let (player, editor) = make_player(codio);

        player.start().unwrap();
        player.pause().unwrap();
        player.forward(0.7).unwrap();
        assert_eq!(content(&editor), "AB", "frame at 700ms holds A and B");

        thread::sleep(Duration::from_millis(700));
        assert_eq!(content(&editor), "ABC", "t=500 must not reapply, t=1200 fires once");
        player.pause().unwrap();
    }

    #[test]
    fn restarting_leaves_a_single_clock_and_schedule() {
        let codio = make_codio(
            400,
            vec![append(0, 0, 'A', 0), append(40, 1, 'B', 1), append(80, 2, 'C', 2)],
        );
        let (player, editor) = make_player(codio);

        let ticks = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&ticks);
        let _sub = player.on_tick(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });

        player.start().unwrap();
        player.start().unwrap();
        thread::sleep(Duration::from_millis(200));
        player.pause().unwrap();

        // Duplicate schedules would double-apply the appends.
        assert_eq!(content(&editor), "ABC");
        // One 10ms tick source over ~200ms; two would give ~40.
        assert!(ticks.load(Ordering::SeqCst) <= 30, "tick sources overlapped");
    }

    #[test]
    fn repeated_pause_resume_never_moves_position_backward() {
        let codio = make_codio(60_000, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        player.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        player.pause().unwrap();

        // Relative time must carry its sub-millisecond fraction across
        // the resume, or every cycle walks the position backward.
        let mut last = player.position().unwrap();
        for _ in 0..20 {
            player.resume().unwrap();
            player.pause().unwrap();
            let now = player.position().unwrap();
            assert!(
                now >= last,
                "position went backward: {:?} -> {:?}",
                last,
                now
            );
            last = now;
        }
    }

    #[test]
    fn restart_resolves_the_previous_sessions_close_signal() {
        let codio = make_codio(5000, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        player.start().unwrap();
        let first = player.closed().unwrap();

        player.start().unwrap();
        assert!(
            first.is_resolved(),
            "waiters from before the restart must wake up"
        );
        first.wait(); // must not block

        let second = player.closed().unwrap();
        assert!(!second.is_resolved());
        player.close().unwrap();
        assert!(second.is_resolved());
    }

    #[test]
    fn finish_racing_a_seek_leaves_the_new_segment_playing() {
        let codio = make_codio(100, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        // Seek right around the moment the clock reaches the end; a
        // finish from the ended run must never freeze the new segment.
        for i in 0..10u64 {
            player.start().unwrap();
            thread::sleep(Duration::from_millis(92 + i));
            player.rewind(0.05).unwrap();
            thread::sleep(Duration::from_millis(20));

            let status = player.status().unwrap();
            assert!(
                status.playing,
                "stale finish froze the seeked segment (iteration {}, position {:?})",
                i, status.position
            );
        }
        player.close().unwrap();
    }

    #[test]
    fn close_resolves_signal_once_and_keeps_codio_loaded() {
        let codio = make_codio(5000, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);

        player.start().unwrap();
        let signal = player.closed().unwrap();
        assert!(!signal.is_resolved());

        player.close().unwrap();
        assert!(signal.is_resolved());
        player.close().unwrap(); // resolving again is harmless

        let status = player.status().unwrap();
        assert!(!status.session_active);
        assert!(!status.playing);
        signal.wait(); // must not block
    }

    #[test]
    fn loading_a_new_codio_tears_down_the_old_session() {
        let (player, editor) = make_player(make_codio(5000, vec![append(0, 0, 'A', 0)]));
        player.start().unwrap();
        let old_signal = player.closed().unwrap();

        player.load_codio(
            make_codio(1000, vec![append(0, 0, 'X', 0)]),
            Box::new(NullAudio),
        );
        assert!(old_signal.is_resolved(), "waiters on the old session wake up");
        assert!(!player.is_playing());

        player.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(content(&editor), "X");
        player.close().unwrap();
    }

    #[test]
    fn status_position_never_exceeds_duration() {
        let codio = make_codio(100, vec![append(0, 0, 'A', 0)]);
        let (player, _) = make_player(codio);
        player.start().unwrap();
        thread::sleep(Duration::from_millis(250));
        let status = player.status().unwrap();
        assert_eq!(status.position, Duration::from_millis(100));
    }
}
