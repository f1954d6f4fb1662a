//! Utility module
//!
//! Tick conversion, frame dumps and logging setup shared by the driver and
//! its hosts.

pub mod logging;

use std::fmt::Write;
use std::time::Duration;

use crate::time::Ticks;

/// Converts a duration into clock ticks, saturating at `Ticks::MAX`
pub fn duration_to_ticks(duration: Duration, ticks_per_second: u32) -> Ticks {
    let ticks = duration.as_nanos() * u128::from(ticks_per_second) / 1_000_000_000;
    Ticks::try_from(ticks).unwrap_or(Ticks::MAX)
}

/// Converts clock ticks back into a duration
pub fn ticks_to_duration(ticks: Ticks, ticks_per_second: u32) -> Duration {
    if ticks_per_second == 0 {
        return Duration::ZERO;
    }
    let nanos = u64::from(ticks) * 1_000_000_000 / u64::from(ticks_per_second);
    Duration::from_nanos(nanos)
}

/// Renders a frame as space-separated bytes, most significant bit first
pub fn bit_string(frame: &[u8]) -> String {
    let mut out = String::with_capacity(frame.len() * 9);
    for (i, byte) in frame.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:08b}", byte);
    }
    out
}
