//! Text scraping of external tool output.
//!
//! Tool output formats are versioned by their upstream projects, so everything
//! that depends on them lives here as pure functions.

use std::sync::OnceLock;

use regex::Regex;

fn percent_regex() -> &'static Regex {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    PERCENT.get_or_init(|| Regex::new(r"([0-9]+)\.[0-9]%").expect("percent pattern is valid"))
}

/// Integer part of the first `NN.N%` in `text`, capped at 100.
pub fn parse_percent(text: &str) -> Option<u8> {
    let caps = percent_regex().captures(text)?;
    let digits = caps.get(1)?.as_str();
    // More digits than fit in u32 still means "past 100".
    let value = digits.parse::<u32>().unwrap_or(u32::MAX);
    Some(value.min(100) as u8)
}

/// Convert a muxer progress ratio to a published percent in [0, 100].
pub fn merge_percent(ratio: f64) -> u8 {
    if ratio.is_nan() {
        return 0;
    }
    (ratio * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// Seconds in an `HH:MM:SS(.fraction)` timestamp. Negative values are rejected.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.trim().splitn(3, ':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Input length from an ffmpeg banner line such as
/// `  Duration: 00:03:12.45, start: 0.000000, bitrate: 128 kb/s`.
pub fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let stamp = rest.split(',').next()?;
    parse_timestamp(stamp)
}

/// Position from an ffmpeg `-progress` key such as `out_time=00:00:31.250000`.
pub fn parse_out_time_line(line: &str) -> Option<f64> {
    let value = line.trim().strip_prefix("out_time=")?;
    parse_timestamp(value)
}
