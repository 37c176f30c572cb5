// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short human-readable duration formatting for log lines.

/// Format milliseconds compactly: `"230ms"`, `"1.5s"`, `"2m10s"`, `"1h5m"`.
///
/// Sub-second durations keep millisecond precision; everything above drops
/// to the two most significant units.
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        let secs = ms as f64 / 1000.0;
        if ms % 1000 == 0 {
            format!("{}s", ms / 1000)
        } else {
            format!("{secs:.1}s")
        }
    } else if ms < 3_600_000 {
        let m = ms / 60_000;
        let s = (ms % 60_000) / 1000;
        if s > 0 {
            format!("{m}m{s}s")
        } else {
            format!("{m}m")
        }
    } else {
        let h = ms / 3_600_000;
        let m = (ms % 3_600_000) / 60_000;
        if m > 0 {
            format!("{h}h{m}m")
        } else {
            format!("{h}h")
        }
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
