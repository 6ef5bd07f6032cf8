//! Editor action records.
//!
//! One `Action` is one captured editor operation: opening a file, an edit,
//! a selection change, a save or a close. Payloads are stored as a tagged
//! JSON object so the timeline file stays readable and diffable.

use serde::{Deserialize, Serialize};

/// Zero-based line/character position inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open text range, `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Empty range at a single position (an insertion point).
    pub fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// The editor operation an action performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Open a file in the editor. `content` is the file's text at open
    /// time when it did not exist in the workspace snapshot.
    OpenFile {
        path: String,
        #[serde(default)]
        content: String,
    },
    /// Replace `range` in an open file with `text`. An empty range is an
    /// insertion, empty `text` a deletion.
    TextEdit {
        path: String,
        range: Range,
        text: String,
    },
    /// Cursor/selection change. `anchor == active` is a bare cursor move.
    Selection {
        path: String,
        anchor: Position,
        active: Position,
    },
    SaveFile { path: String },
    CloseFile { path: String },
}

impl ActionPayload {
    /// Path of the file the action targets.
    pub fn path(&self) -> &str {
        match self {
            ActionPayload::OpenFile { path, .. }
            | ActionPayload::TextEdit { path, .. }
            | ActionPayload::Selection { path, .. }
            | ActionPayload::SaveFile { path }
            | ActionPayload::CloseFile { path } => path,
        }
    }

    /// Short name used in summaries and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionPayload::OpenFile { .. } => "open_file",
            ActionPayload::TextEdit { .. } => "text_edit",
            ActionPayload::Selection { .. } => "selection",
            ActionPayload::SaveFile { .. } => "save_file",
            ActionPayload::CloseFile { .. } => "close_file",
        }
    }
}

/// One timestamped editor action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Milliseconds from the recording's logical start.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    /// Original recording order, the tie-break for equal timestamps.
    pub sequence: u64,
    #[serde(flatten)]
    pub payload: ActionPayload,
}

impl Action {
    pub fn new(timestamp_ms: u64, sequence: u64, payload: ActionPayload) -> Self {
        Self {
            timestamp_ms,
            sequence,
            payload,
        }
    }
}
