//! Workspace snapshot loading.
//!
//! The `workspace/` directory inside a codio is a copy of the project
//! files as they were when recording started. Replay always begins from
//! this state, so the whole tree is read into memory once at load time.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// In-memory copy of the recorded workspace, relative path -> contents.
///
/// Paths use `/` separators regardless of platform so snapshots match the
/// paths stored in the timeline.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSnapshot {
    files: BTreeMap<String, String>,
}

impl WorkspaceSnapshot {
    /// Read every file under `workspace_dir` into the snapshot.
    pub fn load(workspace_dir: &Path) -> Result<Self> {
        if !workspace_dir.is_dir() {
            anyhow::bail!(
                "Missing workspace snapshot: {}",
                workspace_dir.display()
            );
        }
        let mut files = BTreeMap::new();
        collect_files(workspace_dir, workspace_dir, &mut files)?;
        Ok(Self { files })
    }

    /// Build a snapshot directly from path/contents pairs.
    pub fn from_files<I, P, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            files: entries
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    files: &mut BTreeMap<String, String>,
) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read snapshot dir: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Unreadable snapshot file: {}", path.display()))?;
            let relative = path
                .strip_prefix(root)
                .with_context(|| format!("Snapshot file outside root: {}", path.display()))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, content);
        }
    }
    Ok(())
}
