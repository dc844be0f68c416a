//! Human-readable playback time formatting
//!
//! Positions and durations are displayed as `m:ss` below one hour and
//! `h:mm:ss` from one hour up, matching what viewers expect from transport
//! controls.

/// Format a position in seconds as `m:ss` or `h:mm:ss`.
///
/// Negative or non-finite inputs format as `0:00`.
///
/// # Examples
///
/// ```
/// use midroll_common::human_time::format_position_secs;
///
/// assert_eq!(format_position_secs(0.0), "0:00");
/// assert_eq!(format_position_secs(75.0), "1:15");
/// assert_eq!(format_position_secs(3661.0), "1:01:01");
/// ```
pub fn format_position_secs(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = seconds as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format a position in milliseconds as `m:ss` or `h:mm:ss`.
///
/// # Examples
///
/// ```
/// use midroll_common::human_time::format_position_ms;
///
/// assert_eq!(format_position_ms(90_500), "1:30");
/// assert_eq!(format_position_ms(7_200_000), "2:00:00");
/// ```
pub fn format_position_ms(millis: u64) -> String {
    format_position_secs(millis as f64 / 1000.0)
}
