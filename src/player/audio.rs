//! Narration audio channel.
//!
//! The engine treats audio as an opaque play-from-offset/pause primitive;
//! the coordinator is the sole authority on elapsed time, so no position
//! tracking happens here. The default implementation hands the track to
//! an external player process and kills it to pause.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Play-from-offset/pause primitive for the narration track.
pub trait AudioChannel: Send {
    /// Start (or restart) playback `offset` into the track.
    fn play(&mut self, offset: Duration) -> Result<()>;

    /// Stop playback. Idempotent.
    fn pause(&mut self);
}

/// Audio channel that does nothing. Used for `--no-audio` playback and in
/// tests.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioChannel for NullAudio {
    fn play(&mut self, _offset: Duration) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) {}
}

/// Audio channel backed by an external player process.
///
/// The command template is whitespace-split; `{offset}` expands to the
/// start offset in seconds and `{file}` to the track path. A new `play`
/// kills any running player first, so at most one stream is ever active.
pub struct SubprocessAudio {
    command: String,
    track: PathBuf,
    child: Option<Child>,
}

impl SubprocessAudio {
    pub fn new(command: impl Into<String>, track: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            track: track.into(),
            child: None,
        }
    }

    fn build_args(template: &str, offset: Duration, track: &PathBuf) -> Result<Vec<String>> {
        let offset_secs = format!("{:.3}", offset.as_secs_f64());
        let args: Vec<String> = template
            .split_whitespace()
            .map(|part| {
                part.replace("{offset}", &offset_secs)
                    .replace("{file}", &track.to_string_lossy())
            })
            .collect();
        if args.is_empty() {
            bail!("Empty audio player command");
        }
        Ok(args)
    }
}

impl AudioChannel for SubprocessAudio {
    fn play(&mut self, offset: Duration) -> Result<()> {
        self.pause();
        let args = Self::build_args(&self.command, offset, &self.track)?;
        debug!(player = %args[0], offset_secs = offset.as_secs_f64(), "starting audio");
        let child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start audio player: {}", args[0]))?;
        self.child = Some(child);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(mut child) = self.child.take() {
            // The player has no pause protocol; resume re-spawns at the
            // coordinator's offset.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for SubprocessAudio {
    fn drop(&mut self) {
        self.pause();
    }
}
