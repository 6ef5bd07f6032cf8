//! `codio play` — headless playback with simple stdin controls.
//!
//! Drives the playback engine with the built-in virtual editor and the
//! configured audio player. While playing, one line of progress is kept
//! updated and these stdin commands are accepted:
//!
//! ```text
//! p          pause / resume
//! f [secs]   seek forward (default 10)
//! r [secs]   seek backward (default 10)
//! q          quit
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use codio::player::{AudioChannel, NullAudio, Player, SubprocessAudio, VirtualEditor};
use codio::{Codio, Config};

use super::format_duration;

/// Default seek step for `f`/`r` without an argument.
const SEEK_STEP_SECS: f64 = 10.0;

pub fn handle(path: &Path, start_at: Option<f64>, no_audio: bool) -> Result<()> {
    let config = Config::load()?;
    let codio = Codio::load(path)?;
    println!(
        "Playing '{}' ({})  [p=pause/resume, f/r=seek, q=quit]",
        codio.metadata.name,
        format_duration(codio.duration_ms())
    );

    let audio: Box<dyn AudioChannel> = if no_audio || config.playback.no_audio {
        Box::new(NullAudio)
    } else {
        Box::new(SubprocessAudio::new(
            config.playback.audio_player.clone(),
            codio.audio.clone(),
        ))
    };

    let editor = Arc::new(Mutex::new(VirtualEditor::new()));
    let player = Player::with_tick_interval(editor, config.tick_interval());
    player.load_codio(codio, audio);

    let _tick_sub = player.on_tick(|tick| {
        print!(
            "\r  {} / {}   ",
            format_duration(tick.current_ms),
            format_duration(tick.total_ms)
        );
        let _ = io::stdout().flush();
    });

    player.start()?;
    if let Some(secs) = start_at {
        player.forward(secs)?;
    }
    let closed = player.closed().context("session did not start")?;

    spawn_command_loop(player.clone());

    // The close signal fires on `q` or when playback runs to the end.
    loop {
        if closed.wait_timeout(Duration::from_millis(200)) {
            break;
        }
        if let Some(status) = player.status() {
            if !status.playing && status.position >= status.duration {
                player.close()?;
            }
        }
    }
    println!();
    Ok(())
}

/// Read stdin commands until quit or EOF. The player serializes the
/// operations, so this thread can issue them directly.
fn spawn_command_loop(player: Player) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if dispatch(&player, line.trim()).is_break() {
                break;
            }
        }
    });
}

fn dispatch(player: &Player, line: &str) -> std::ops::ControlFlow<()> {
    let mut parts = line.split_whitespace();
    let result = match parts.next() {
        None => Ok(()),
        Some("p") => {
            if player.is_playing() {
                player.pause()
            } else {
                player.resume()
            }
        }
        Some("f") => player.forward(parse_step(parts.next())),
        Some("r") => player.rewind(parse_step(parts.next())),
        Some("q") => {
            let _ = player.close();
            return std::ops::ControlFlow::Break(());
        }
        Some(other) => {
            eprintln!("unknown command '{}' (p, f [secs], r [secs], q)", other);
            Ok(())
        }
    };
    if let Err(err) = result {
        warn!(error = %err, "playback command failed");
    }
    std::ops::ControlFlow::Continue(())
}

fn parse_step(arg: Option<&str>) -> f64 {
    arg.and_then(|s| s.parse().ok()).unwrap_or(SEEK_STEP_SECS)
}
