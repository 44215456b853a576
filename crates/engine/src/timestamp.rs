// Trim timestamp parsing

use crate::error::{EncodeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static CLOCK_MILLIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})\.(\d{3})$").expect("valid regex"));

// Accepts any fractional tail, e.g. "00:00:01.5"
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})(\.\d+)?$").expect("valid regex"));

// Plain decimal seconds; no sign, exponent or special values
static SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

/// Parses `HH:MM:SS.mmm`, `HH:MM:SS` or bare seconds into seconds.
/// The first format that matches wins.
pub fn parse_timestamp(input: &str) -> Result<f64> {
    let input = input.trim();

    if let Some(secs) = parse_clock(&CLOCK_MILLIS, input) {
        return Ok(secs);
    }
    if let Some(secs) = parse_clock(&CLOCK, input) {
        return Ok(secs);
    }
    if !SECONDS.is_match(input) {
        return Err(EncodeError::TimestampParse(input.to_string()));
    }
    input
        .parse::<f64>()
        .map_err(|_| EncodeError::TimestampParse(input.to_string()))
}

fn parse_clock(pattern: &Regex, input: &str) -> Option<f64> {
    let caps = pattern.captures(input)?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    let seconds: u32 = caps[3].parse().ok()?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let fraction = match caps.get(4) {
        Some(m) => {
            let digits = m.as_str().trim_start_matches('.');
            format!("0.{}", digits).parse::<f64>().ok()?
        }
        None => 0.0,
    };

    Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + f64::from(seconds) + fraction)
}
