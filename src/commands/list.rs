//! `codio list` — enumerate codios in the library folder.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use humansize::{format_size, DECIMAL};

use codio::library;
use codio::Config;

use super::format_duration;

pub fn handle(dir: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let library_dir = dir.unwrap_or(config.library.codios_dir);

    let codios = library::scan(&library_dir)?;
    if codios.is_empty() {
        println!("No codios in {}", library_dir.display());
        return Ok(());
    }

    println!("{:<30} {:<12} {:>8} {:>10}", "NAME", "ID", "LENGTH", "SIZE");
    for entry in codios {
        let size = dir_size(&entry.dir).unwrap_or(0);
        println!(
            "{:<30} {:<12} {:>8} {:>10}",
            entry.metadata.name,
            entry.metadata.id,
            format_duration(entry.metadata.length_ms),
            format_size(size, DECIMAL)
        );
    }
    Ok(())
}

/// Total size in bytes of all files under `dir`.
fn dir_size(dir: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}
