//! Spoken rendering of the time left before an event.

use chrono::TimeDelta;

/// Seconds taken off the remaining time before the "less than a minute" check.
///
/// Synthesis and playback take a few seconds, so an alert computed at 62
/// seconds is heard with less than a minute left.
const PLAYBACK_SKEW_SECONDS: i64 = 5;

/// Text used when the event is at most a minute away.
const LESS_THAN_A_MINUTE: &str = "less than 1 minute";

/// Formats a remaining duration for text-to-speech.
///
/// - At most a minute left (after the playback skew): `"less than 1 minute"`.
/// - Otherwise hours, minutes and seconds, zero components omitted. Seconds
///   are only spoken below 30 minutes.
///
/// Units are always plural, `"1 hours"` included.
///
/// # Examples
///
/// ```no_run
/// assert_eq!(format_time_remaining(TimeDelta::seconds(45)), "less than 1 minute");
/// assert_eq!(format_time_remaining(TimeDelta::seconds(3725)), "1 hours 2 minutes");
/// assert_eq!(format_time_remaining(TimeDelta::seconds(90)), "1 minutes 30 seconds");
/// ```
pub fn format_time_remaining(remaining: TimeDelta) -> String {
    let total_seconds = remaining.num_seconds();

    if total_seconds - PLAYBACK_SKEW_SECONDS <= 60 {
        return LESS_THAN_A_MINUTE.to_string();
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts: Vec<String> = Vec::new();
    if hours != 0 {
        parts.push(format!("{} hours", hours));
    }
    if minutes != 0 {
        parts.push(format!("{} minutes", minutes));
    }
    if hours == 0 && minutes < 30 && seconds != 0 {
        parts.push(format!("{} seconds", seconds));
    }

    parts.join(" ")
}
