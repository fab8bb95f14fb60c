// SPDX-License-Identifier: GPL-3.0-only

//! Time readout formatting for the control bar.

/// Format a duration in seconds for display.
///
/// | Range    | Format    | Example   |
/// |----------|-----------|-----------|
/// | ≥ 3600 s | `H:MM:SS` | `1:01:01` |
/// | < 3600 s | `MM:SS`   | `01:05`   |
///
/// Sub-second parts are truncated, never rounded up — `3599.9` stays
/// `59:59` rather than ticking over to the hour form.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Elapsed/total readout, e.g. `01:05/02:10`.
///
/// The total is omitted until the engine has reported a real duration.
pub fn format_time(elapsed: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{}/{}", format_duration(elapsed), format_duration(total))
    } else {
        format_duration(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_and_seconds_are_zero_padded() {
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(65.0), "01:05");
        assert_eq!(format_duration(599.0), "09:59");
    }

    #[test]
    fn hours_appear_unpadded_past_one_hour() {
        assert_eq!(format_duration(3600.0), "1:00:00");
        assert_eq!(format_duration(3661.0), "1:01:01");
        assert_eq!(format_duration(36_000.0), "10:00:00");
    }

    #[test]
    fn subseconds_truncate_instead_of_rounding() {
        assert_eq!(format_duration(3599.9), "59:59");
        assert_eq!(format_duration(59.999), "00:59");
    }

    #[test]
    fn negative_input_clamps_to_zero() {
        assert_eq!(format_duration(-1.0), "00:00");
    }

    #[test]
    fn total_is_appended_only_when_known() {
        assert_eq!(format_time(65.0, 130.0), "01:05/02:10");
        assert_eq!(format_time(65.0, 0.0), "01:05");
        assert_eq!(format_time(65.0, -1.0), "01:05");
    }
}
