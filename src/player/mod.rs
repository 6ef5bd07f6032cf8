//! Codio playback engine.
//!
//! A playback session keeps three channels in lock-step: recorded editor
//! actions, the narration audio track, and a progress clock. The
//! `Player` coordinator owns the session and exposes the public
//! play/pause/seek/close surface.
//!
//! # Architecture
//!
//! - `session`: relative-time bookkeeping and the one-shot close signal
//! - `clock`: wall-clock ticking with update/finish observers
//! - `replayer`: frame reconstruction and wall-clock action scheduling
//! - `editor`: the `EditorBackend` seam plus the in-memory editor
//! - `audio`: opaque play-from-offset/pause narration channel
//! - `subscribers`: per-instance observer sets with drop-to-unsubscribe
//! - `coordinator`: the `Player` orchestrating all of the above
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use codio::player::{NullAudio, Player, VirtualEditor};
//!
//! let editor = Arc::new(Mutex::new(VirtualEditor::new()));
//! let player = Player::new(editor);
//! player.load("lesson-1".as_ref(), Box::new(NullAudio)).unwrap();
//! player.start().unwrap();
//! player.closed().unwrap().wait();
//! ```

pub mod audio;
pub mod clock;
mod coordinator;
pub mod editor;
pub mod replayer;
pub mod session;
pub mod subscribers;

pub use audio::{AudioChannel, NullAudio, SubprocessAudio};
pub use clock::{ProgressClock, Tick};
pub use coordinator::{Player, PlayerStatus};
pub use editor::{EditorBackend, EditorError, VirtualEditor};
pub use replayer::Replayer;
pub use session::{CloseSignal, SessionState, StateChange};
pub use subscribers::{Subscribers, Subscription};
