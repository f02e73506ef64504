#![forbid(unsafe_code)]

//! Human-readable sizes and durations for load diagnostics.

use std::{fmt::Write, time::Duration};

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count: `"123 Bytes"`, `"1.00 KB"`, ... up to `"TB"`.
///
/// Values at or above 1024 are shown with two decimals in the largest unit
/// that keeps the value >= 1; anything beyond terabytes stays in `TB`.
#[must_use]
pub fn format_file_size(size: u64) -> String {
    #[expect(clippy::cast_precision_loss)] // display only
    let mut value = size as f64;
    if value < 1024.0 {
        return format!("{size} Bytes");
    }

    let mut unit = 0;
    value /= 1024.0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Format a duration as `[<h>h][<m>m]<ss>.<mmm>`, e.g. `"1h2m03.004"`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let ms = millis % 1000;
    let total_seconds = millis / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{seconds:02}.{ms:03}");
    out
}
