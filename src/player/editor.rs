//! Editor backend seam and the in-memory implementation.
//!
//! The replayer drives an editor through the `EditorBackend` trait: reset
//! to the workspace snapshot, then apply single actions. The host editor
//! integration lives outside this crate; `VirtualEditor` is the built-in
//! backend used by headless playback and tests. It reconstructs workspace
//! text state from the action stream the same way the terminal emulator
//! in a cast player reconstructs screen state from output events.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::library::WorkspaceSnapshot;
use crate::timeline::{Action, ActionPayload, Position};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("file not open: {0}")]
    FileNotOpen(String),
    #[error("line {line} out of bounds in {path} ({lines} lines)")]
    LineOutOfBounds {
        path: String,
        line: u32,
        lines: usize,
    },
    #[error("range start after range end in {0}")]
    InvertedRange(String),
}

/// Raw editor-manipulation primitives the replayer drives.
///
/// Implementations must make `apply` atomic: validate first, then mutate,
/// so a failed action leaves the editor untouched.
pub trait EditorBackend: Send {
    /// Discard all state and restore the workspace snapshot.
    fn reset(&mut self, snapshot: &WorkspaceSnapshot) -> Result<(), EditorError>;

    /// Apply a single recorded action.
    fn apply(&mut self, action: &Action) -> Result<(), EditorError>;
}

/// Most recent cursor/selection, for hosts that render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub path: String,
    pub anchor: Position,
    pub active: Position,
}

/// In-memory editor: a file map plus open-file and selection state.
#[derive(Debug, Default)]
pub struct VirtualEditor {
    files: BTreeMap<String, String>,
    open: BTreeSet<String>,
    selection: Option<SelectionState>,
}

impl VirtualEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_content(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn open_files(&self) -> impl Iterator<Item = &str> {
        self.open.iter().map(String::as_str)
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.open.contains(path)
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }

    /// Byte offset of a position, clamping `character` to the line length.
    ///
    /// Editors clamp column overshoot rather than reject it, and recorded
    /// selections routinely point one past a shrunken line.
    fn offset_of(&self, path: &str, content: &str, pos: Position) -> Result<usize, EditorError> {
        let mut line_start = 0usize;
        let mut line_idx = 0u32;
        for (idx, ch) in content.char_indices() {
            if line_idx == pos.line {
                break;
            }
            if ch == '\n' {
                line_start = idx + 1;
                line_idx += 1;
            }
        }
        if line_idx < pos.line {
            return Err(EditorError::LineOutOfBounds {
                path: path.to_string(),
                line: pos.line,
                lines: line_idx as usize + 1,
            });
        }

        let line_end = content[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(content.len());
        let line = &content[line_start..line_end];
        let offset_in_line = line
            .char_indices()
            .nth(pos.character as usize)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        Ok(line_start + offset_in_line)
    }
}

impl EditorBackend for VirtualEditor {
    fn reset(&mut self, snapshot: &WorkspaceSnapshot) -> Result<(), EditorError> {
        self.files = snapshot.files().clone();
        self.open.clear();
        self.selection = None;
        Ok(())
    }

    fn apply(&mut self, action: &Action) -> Result<(), EditorError> {
        match &action.payload {
            ActionPayload::OpenFile { path, content } => {
                // Files absent from the snapshot were created during the
                // recording; the action carries their text.
                self.files
                    .entry(path.clone())
                    .or_insert_with(|| content.clone());
                self.open.insert(path.clone());
            }
            ActionPayload::TextEdit { path, range, text } => {
                let current = self
                    .files
                    .get(path)
                    .ok_or_else(|| EditorError::FileNotFound(path.clone()))?;
                let start = self.offset_of(path, current, range.start)?;
                let end = self.offset_of(path, current, range.end)?;
                if start > end {
                    return Err(EditorError::InvertedRange(path.clone()));
                }
                let mut updated = String::with_capacity(current.len() + text.len());
                updated.push_str(&current[..start]);
                updated.push_str(text);
                updated.push_str(&current[end..]);
                self.files.insert(path.clone(), updated);
            }
            ActionPayload::Selection {
                path,
                anchor,
                active,
            } => {
                if !self.files.contains_key(path) {
                    return Err(EditorError::FileNotFound(path.clone()));
                }
                self.selection = Some(SelectionState {
                    path: path.clone(),
                    anchor: *anchor,
                    active: *active,
                });
            }
            ActionPayload::SaveFile { path } => {
                if !self.files.contains_key(path) {
                    return Err(EditorError::FileNotFound(path.clone()));
                }
                // Persistence is the host's concern; the virtual editor
                // only validates the target.
            }
            ActionPayload::CloseFile { path } => {
                if !self.open.remove(path) {
                    return Err(EditorError::FileNotOpen(path.clone()));
                }
                if self.selection.as_ref().is_some_and(|s| &s.path == path) {
                    self.selection = None;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Range;

    fn edit(path: &str, range: Range, text: &str) -> Action {
        Action::new(
            0,
            0,
            ActionPayload::TextEdit {
                path: path.to_string(),
                range,
                text: text.to_string(),
            },
        )
    }

    fn editor_with(path: &str, content: &str) -> VirtualEditor {
        let mut editor = VirtualEditor::new();
        editor
            .reset(&WorkspaceSnapshot::from_files([(path, content)]))
            .unwrap();
        editor
    }

    #[test]
    fn insert_mid_line() {
        let mut editor = editor_with("a.rs", "hello world\n");
        let action = edit(
            "a.rs",
            Range::at(Position::new(0, 5)),
            ",",
        );
        editor.apply(&action).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("hello, world\n"));
    }

    #[test]
    fn replace_across_lines() {
        let mut editor = editor_with("a.rs", "one\ntwo\nthree\n");
        let action = edit(
            "a.rs",
            Range::new(Position::new(0, 1), Position::new(2, 2)),
            "-",
        );
        editor.apply(&action).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("o-ree\n"));
    }

    #[test]
    fn delete_with_empty_text() {
        let mut editor = editor_with("a.rs", "abcdef");
        let action = edit(
            "a.rs",
            Range::new(Position::new(0, 1), Position::new(0, 4)),
            "",
        );
        editor.apply(&action).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("aef"));
    }

    #[test]
    fn append_after_trailing_newline() {
        let mut editor = editor_with("a.rs", "line\n");
        let action = edit("a.rs", Range::at(Position::new(1, 0)), "next");
        editor.apply(&action).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("line\nnext"));
    }

    #[test]
    fn character_overshoot_clamps_to_line_end() {
        let mut editor = editor_with("a.rs", "ab\ncd\n");
        let action = edit("a.rs", Range::at(Position::new(0, 99)), "!");
        editor.apply(&action).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("ab!\ncd\n"));
    }

    #[test]
    fn edit_unknown_file_fails_and_leaves_state() {
        let mut editor = editor_with("a.rs", "text");
        let action = edit("b.rs", Range::at(Position::new(0, 0)), "x");
        assert_eq!(
            editor.apply(&action),
            Err(EditorError::FileNotFound("b.rs".to_string()))
        );
        assert_eq!(editor.file_content("a.rs"), Some("text"));
    }

    #[test]
    fn line_out_of_bounds_fails() {
        let mut editor = editor_with("a.rs", "one line");
        let action = edit("a.rs", Range::at(Position::new(5, 0)), "x");
        assert!(matches!(
            editor.apply(&action),
            Err(EditorError::LineOutOfBounds { line: 5, .. })
        ));
    }

    #[test]
    fn open_file_from_recording_carries_content() {
        let mut editor = VirtualEditor::new();
        editor.reset(&WorkspaceSnapshot::default()).unwrap();
        let action = Action::new(
            0,
            0,
            ActionPayload::OpenFile {
                path: "new.rs".to_string(),
                content: "// fresh\n".to_string(),
            },
        );
        editor.apply(&action).unwrap();
        assert!(editor.is_open("new.rs"));
        assert_eq!(editor.file_content("new.rs"), Some("// fresh\n"));
    }

    #[test]
    fn open_existing_file_keeps_snapshot_content() {
        let mut editor = editor_with("a.rs", "snapshot text");
        let action = Action::new(
            0,
            0,
            ActionPayload::OpenFile {
                path: "a.rs".to_string(),
                content: String::new(),
            },
        );
        editor.apply(&action).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("snapshot text"));
        assert!(editor.is_open("a.rs"));
    }

    #[test]
    fn close_clears_selection_on_that_file() {
        let mut editor = editor_with("a.rs", "text");
        editor
            .apply(&Action::new(
                0,
                0,
                ActionPayload::OpenFile {
                    path: "a.rs".to_string(),
                    content: String::new(),
                },
            ))
            .unwrap();
        editor
            .apply(&Action::new(
                0,
                1,
                ActionPayload::Selection {
                    path: "a.rs".to_string(),
                    anchor: Position::new(0, 0),
                    active: Position::new(0, 2),
                },
            ))
            .unwrap();
        assert!(editor.selection().is_some());

        editor
            .apply(&Action::new(
                0,
                2,
                ActionPayload::CloseFile {
                    path: "a.rs".to_string(),
                },
            ))
            .unwrap();
        assert!(!editor.is_open("a.rs"));
        assert!(editor.selection().is_none());
    }

    #[test]
    fn reset_restores_snapshot() {
        let snapshot = WorkspaceSnapshot::from_files([("a.rs", "original")]);
        let mut editor = VirtualEditor::new();
        editor.reset(&snapshot).unwrap();
        editor
            .apply(&edit("a.rs", Range::at(Position::new(0, 0)), "mut-"))
            .unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("mut-original"));

        editor.reset(&snapshot).unwrap();
        assert_eq!(editor.file_content("a.rs"), Some("original"));
        assert_eq!(editor.open_files().count(), 0);
    }
}
