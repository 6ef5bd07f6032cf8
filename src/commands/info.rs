//! `codio info` — metadata and timeline summary for one codio.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use codio::Codio;

use super::format_duration;

pub fn handle(path: &Path) -> Result<()> {
    let codio = Codio::load(path)?;

    println!("Name:      {}", codio.metadata.name);
    println!("Id:        {}", codio.metadata.id);
    println!("Length:    {}", format_duration(codio.duration_ms()));
    if let Some(recorded_at) = codio.metadata.recorded_at {
        println!("Recorded:  {}", recorded_at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("Workspace: {} file(s)", codio.snapshot.len());
    println!("Actions:   {}", codio.timeline.len());

    let mut per_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for action in codio.timeline.actions() {
        *per_kind.entry(action.payload.kind()).or_insert(0) += 1;
    }
    for (kind, count) in per_kind {
        println!("  {:<12} {}", kind, count);
    }

    Ok(())
}
