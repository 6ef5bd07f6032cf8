//! Codio package layout and library enumeration.
//!
//! An unpacked codio is a directory with a fixed layout:
//!
//! ```text
//! <codio>/
//!   meta.json       metadata record (id, name, length)
//!   codio.json      editor action timeline
//!   audio.mp3       narration track
//!   workspace/      snapshot of the workspace at recording start
//!   subtitles.srt   optional, presentation-only
//! ```
//!
//! Archive packing/unpacking is handled by external tooling; this module
//! only consumes already-unpacked directories.

mod snapshot;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::timeline::Timeline;

pub use snapshot::WorkspaceSnapshot;

pub const METADATA_FILE: &str = "meta.json";
pub const TIMELINE_FILE: &str = "codio.json";
pub const AUDIO_FILE: &str = "audio.mp3";
pub const WORKSPACE_DIR: &str = "workspace";
pub const SUBTITLES_FILE: &str = "subtitles.srt";

pub fn metadata_path(codio_dir: &Path) -> PathBuf {
    codio_dir.join(METADATA_FILE)
}

pub fn timeline_path(codio_dir: &Path) -> PathBuf {
    codio_dir.join(TIMELINE_FILE)
}

pub fn audio_path(codio_dir: &Path) -> PathBuf {
    codio_dir.join(AUDIO_FILE)
}

pub fn workspace_path(codio_dir: &Path) -> PathBuf {
    codio_dir.join(WORKSPACE_DIR)
}

pub fn subtitles_path(codio_dir: &Path) -> PathBuf {
    codio_dir.join(SUBTITLES_FILE)
}

/// Metadata record stored in `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub id: String,
    pub name: String,
    #[serde(rename = "lengthMs")]
    pub length_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Load the metadata record from a codio directory.
    pub fn load(codio_dir: &Path) -> Result<Self> {
        let path = metadata_path(codio_dir);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed metadata: {}", path.display()))
    }

    /// Write the metadata record into a codio directory.
    pub fn save(&self, codio_dir: &Path) -> Result<()> {
        let path = metadata_path(codio_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize metadata")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write metadata: {}", path.display()))
    }
}

/// A fully resolved codio, immutable once loaded.
///
/// Holds everything a playback session needs: the timeline, the workspace
/// snapshot, and the path to the narration track. Loading validates every
/// required piece up front so no partially usable codio escapes.
#[derive(Debug, Clone)]
pub struct Codio {
    pub dir: PathBuf,
    pub metadata: Metadata,
    pub timeline: Timeline,
    pub snapshot: WorkspaceSnapshot,
    pub audio: PathBuf,
}

impl Codio {
    /// Load and validate a codio from an unpacked directory.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("Not a codio directory: {}", dir.display());
        }

        let metadata = Metadata::load(dir)?;
        let timeline = Timeline::parse(timeline_path(dir))?;
        let snapshot = WorkspaceSnapshot::load(&workspace_path(dir))?;

        let audio = audio_path(dir);
        if !audio.is_file() {
            bail!("Missing audio track: {}", audio.display());
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            metadata,
            timeline,
            snapshot,
            audio,
        })
    }

    /// Recording length in milliseconds.
    ///
    /// The timeline is authoritative; `meta.json` carries the length only
    /// so listings can avoid parsing the full timeline.
    pub fn duration_ms(&self) -> u64 {
        self.timeline.duration_ms()
    }
}

/// A codio discovered in a library folder, metadata only.
#[derive(Debug, Clone)]
pub struct CodioEntry {
    pub dir: PathBuf,
    pub metadata: Metadata,
}

/// Enumerate codios under a library folder, sorted by name.
///
/// Entries that are not readable codio directories are skipped with a
/// warning rather than failing the whole scan.
pub fn scan<P: AsRef<Path>>(library_dir: P) -> Result<Vec<CodioEntry>> {
    let library_dir = library_dir.as_ref();
    let entries = fs::read_dir(library_dir)
        .with_context(|| format!("Failed to read library folder: {}", library_dir.display()))?;

    let mut codios = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match Metadata::load(&path) {
            Ok(metadata) => codios.push(CodioEntry {
                dir: path,
                metadata,
            }),
            Err(err) => {
                warn!(dir = %path.display(), error = %err, "skipping unreadable codio");
            }
        }
    }

    codios.sort_by_key(|c| c.metadata.name.to_lowercase());
    Ok(codios)
}
