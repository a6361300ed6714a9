//! Pattern timing and level state, plus the text attribute codecs.
//!
//! The attribute formats mirror the sysfs-style surface the platform layer
//! exposes: times are five whitespace-separated unsigned integers
//! (delay, rise, high, fall, low; milliseconds), levels are two unsigned
//! integers clamped to the brightness range, run-pattern is a boolean-like
//! integer.

use core::fmt::Write as _;

use heapless::String;

use crate::chip::MAX_BRIGHTNESS;
use crate::{Error, Result};

// ============================================================================
// Pattern state
// ============================================================================

/// Pattern phase durations in milliseconds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternTime {
    /// Delay before the pattern starts.
    pub delay: u32,
    /// Rise ramp duration.
    pub rise: u32,
    /// Time held at the high level.
    pub high: u32,
    /// Fall ramp duration.
    pub fall: u32,
    /// Time held at the low level.
    pub low: u32,
}

/// Pattern boundary brightness levels.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PatternLevel {
    /// Brightness during the low phase.
    pub low: u8,
    /// Brightness during the high phase.
    pub high: u8,
}

// ============================================================================
// Attribute codecs
// ============================================================================

fn parse_token(token: Option<&str>) -> Result<u32> {
    token
        .ok_or(Error::PatternParse)?
        .parse()
        .map_err(|_| Error::PatternParse)
}

/// Parses a pattern-times attribute write: exactly five unsigned integers.
pub fn parse_pattern_times(input: &str) -> Result<PatternTime> {
    let mut tokens = input.split_ascii_whitespace();
    let mut fields = [0u32; 5];
    for field in &mut fields {
        *field = parse_token(tokens.next())?;
    }
    if tokens.next().is_some() {
        return Err(Error::PatternParse);
    }
    let [delay, rise, high, fall, low] = fields;
    Ok(PatternTime {
        delay,
        rise,
        high,
        fall,
        low,
    })
}

/// Parses a pattern-levels attribute write: exactly two unsigned integers,
/// each clamped to the brightness range.
pub fn parse_pattern_levels(input: &str) -> Result<PatternLevel> {
    let mut tokens = input.split_ascii_whitespace();
    let low = parse_token(tokens.next())?;
    let high = parse_token(tokens.next())?;
    if tokens.next().is_some() {
        return Err(Error::PatternParse);
    }
    let max = u32::from(MAX_BRIGHTNESS);
    Ok(PatternLevel {
        low: low.min(max) as u8,
        high: high.min(max) as u8,
    })
}

/// Parses a run-pattern attribute write: a base-0 unsigned integer
/// (decimal, or hexadecimal with a `0x` prefix); nonzero starts the pattern.
pub fn parse_run_pattern(input: &str) -> Result<bool> {
    let token = input.trim();
    let value = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        token.parse()
    }
    .map_err(|_| Error::PatternParse)?;
    Ok(value != 0)
}

/// Formats the pattern-times attribute read.
pub fn format_pattern_times(time: &PatternTime) -> Result<String<96>> {
    let mut out = String::new();
    write!(
        out,
        "delay: {}, rise: {}, high:{}, fall:{}, low: {}",
        time.delay, time.rise, time.high, time.fall, time.low
    )
    .map_err(|_| Error::Format)?;
    Ok(out)
}

/// Formats the pattern-levels attribute read.
pub fn format_pattern_levels(level: &PatternLevel) -> Result<String<64>> {
    let mut out = String::new();
    write!(
        out,
        "low brightness: {}, high brightness: {}",
        level.low, level.high
    )
    .map_err(|_| Error::Format)?;
    Ok(out)
}
