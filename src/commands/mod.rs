//! CLI subcommand handlers.

pub mod info;
pub mod list;
pub mod play;

/// Render a millisecond duration as `3m12s` / `45s` / `0.8s`.
pub(crate) fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return format!("{:.1}s", ms as f64 / 1000.0);
    }
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    if mins == 0 {
        format!("{}s", secs)
    } else {
        format!("{}m{:02}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_covers_ranges() {
        assert_eq!(format_duration(800), "0.8s");
        assert_eq!(format_duration(45_000), "45s");
        assert_eq!(format_duration(192_000), "3m12s");
        assert_eq!(format_duration(3_600_000), "60m00s");
    }
}
