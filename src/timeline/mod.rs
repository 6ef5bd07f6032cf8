//! Codio timeline format parser and writer
//!
//! A timeline (`codio.json` inside an unpacked codio directory) is the
//! ordered sequence of timestamped editor actions captured during a
//! recording session, together with the total recording length.
//!
//! Timestamps are milliseconds from the recording's logical start. When
//! two actions carry the same timestamp, the original recording order is
//! preserved through the `sequence` field, which is the tie-break for
//! replay order.

mod action;

use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub use action::{Action, ActionPayload, Position, Range};

/// Complete timeline of one recording.
///
/// Actions are kept in replay order: non-decreasing `timestamp_ms`, ties
/// broken by `sequence`. `parse` normalizes the order on load, so lookups
/// can binary-search by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Total recording length in milliseconds.
    #[serde(rename = "codioLength")]
    duration_ms: u64,
    #[serde(rename = "events")]
    actions: Vec<Action>,
}

impl Timeline {
    /// Build a timeline from raw parts, normalizing action order.
    ///
    /// A zero `duration_ms` falls back to the last action's timestamp.
    pub fn new(duration_ms: u64, actions: Vec<Action>) -> Self {
        let mut timeline = Self {
            duration_ms,
            actions,
        };
        timeline.normalize();
        timeline
    }

    /// Parse a timeline file from a path.
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open timeline: {}", path.display()))?;
        Self::parse_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse timeline: {}", path.display()))
    }

    /// Parse a timeline from a reader.
    pub fn parse_reader<R: Read>(reader: R) -> Result<Self> {
        let mut timeline: Timeline =
            serde_json::from_reader(reader).context("Malformed timeline JSON")?;
        if timeline.duration_ms == 0 && timeline.actions.is_empty() {
            bail!("Timeline has no duration and no actions");
        }
        timeline.normalize();
        Ok(timeline)
    }

    /// Parse a timeline from a string.
    pub fn parse_str(content: &str) -> Result<Self> {
        Self::parse_reader(content.as_bytes())
    }

    /// Write the timeline to a path.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create timeline file: {}", path.display()))?;
        self.write_to(&mut file)
    }

    /// Write the timeline to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer(writer, self).context("Failed to serialize timeline")?;
        Ok(())
    }

    /// Restore replay order and the duration fallback.
    ///
    /// Recording order is the secondary sort key, so equal-timestamp
    /// actions replay exactly as they were captured.
    fn normalize(&mut self) {
        self.actions
            .sort_by_key(|a| (a.timestamp_ms, a.sequence));
        let last = self.actions.last().map(|a| a.timestamp_ms).unwrap_or(0);
        if self.duration_ms == 0 {
            self.duration_ms = last;
        }
    }

    /// Total recording length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// All actions in replay order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Index of the first action with `timestamp_ms > offset_ms`.
    fn split_index(&self, offset_ms: u64) -> usize {
        self.actions
            .partition_point(|a| a.timestamp_ms <= offset_ms)
    }

    /// Actions with `timestamp_ms <= offset_ms`, in replay order.
    ///
    /// These are the actions that make up the frame at `offset_ms`.
    pub fn actions_until(&self, offset_ms: u64) -> &[Action] {
        &self.actions[..self.split_index(offset_ms)]
    }

    /// Actions with `timestamp_ms > offset_ms`, in replay order, excluding
    /// anything recorded past the timeline's duration.
    ///
    /// These are the actions still pending when playback resumes from
    /// `offset_ms`; each keeps its original timestamp for scheduling.
    pub fn actions_after(&self, offset_ms: u64) -> Vec<Action> {
        self.actions[self.split_index(offset_ms)..]
            .iter()
            .filter(|a| a.timestamp_ms <= self.duration_ms)
            .cloned()
            .collect()
    }
}
