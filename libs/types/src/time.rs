//! Timestamps and durations
//!
//! All times are unix seconds supplied by the caller. Nothing in the vault
//! reads a clock.

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Duration in seconds
pub type Seconds = i64;

pub const HOUR: Seconds = 3_600;
pub const DAY: Seconds = 24 * HOUR;

/// Saturating `at + delay`, so far-future timestamps never wrap.
pub fn deadline(at: Timestamp, delay: Seconds) -> Timestamp {
    at.saturating_add(delay)
}
