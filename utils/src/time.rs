//! Time formatting helpers.

/// Format a duration in seconds to a human-readable string.
///
/// Used when logging voting deadlines and timelock ETAs.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timelock_default_reads_as_two_days() {
        assert_eq!(format_duration(172_800), "2d 0h");
    }

    #[test]
    fn short_durations() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(300), "5m 0s");
        assert_eq!(format_duration(3_660), "1h 1m");
    }
}
