//! codio — record and replay programming sessions as interactive
//! tutorials.
//!
//! A codio pairs a timeline of editor actions with a narration audio
//! track and a workspace snapshot. This crate implements the playback
//! side: loading unpacked codios from a library folder and replaying
//! them in lock-step with the narration, with pause, resume and seeking.
//!
//! The interesting part lives in [`player`]: a coordinator that derives
//! everything from a single relative clock so that editor state, audio
//! and progress reporting stay consistent across arbitrary pause/seek
//! sequences.

pub mod config;
pub mod library;
pub mod player;
pub mod timeline;

pub use config::Config;
pub use library::{Codio, Metadata, WorkspaceSnapshot};
pub use player::{Player, PlayerStatus};
pub use timeline::{Action, ActionPayload, Timeline};
