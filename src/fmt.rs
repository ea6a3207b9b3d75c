//! Human-readable formatting of sizes, rates and durations.
//!
//! Used by the daemon's per-tick summary; kept free of any presentation
//! layer so other consumers can share it.

/// Controls compact (log lines, columns) vs verbose (detail views) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtStyle {
    /// `"1.5G"`, `"3m5s"`
    Compact,
    /// `"1.50 GiB"`, `"3m 5s"`
    Detail,
}

const COMPACT_UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];
const DETAIL_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Divides by 1024 until the value fits, stopping at TiB.
fn scale(value: f64) -> (f64, usize) {
    let mut v = value;
    let mut idx = 0;
    while v >= 1024.0 && idx < COMPACT_UNITS.len() - 1 {
        v /= 1024.0;
        idx += 1;
    }
    (v, idx)
}

/// Compact: `"512B"`, `"50.0K"`, `"1.5G"`.
/// Detail: `"512.00 B"`, `"1.50 GiB"`.
pub fn format_size(bytes: u64, style: FmtStyle) -> String {
    let (v, idx) = scale(bytes as f64);
    match style {
        FmtStyle::Compact if idx == 0 => format!("{}B", bytes),
        FmtStyle::Compact => format!("{:.1}{}", v, COMPACT_UNITS[idx]),
        FmtStyle::Detail => format!("{:.2} {}", v, DETAIL_UNITS[idx]),
    }
}

/// Like `format_size` with a `/s` suffix; `"-"` when no rate is known yet.
pub fn format_bytes_rate(rate: Option<f64>, style: FmtStyle) -> String {
    let Some(rate) = rate else {
        return "-".to_string();
    };
    let (v, idx) = scale(rate.max(0.0));
    match style {
        FmtStyle::Compact => format!("{:.1}{}/s", v, COMPACT_UNITS[idx]),
        FmtStyle::Detail => format!("{:.2} {}/s", v, DETAIL_UNITS[idx]),
    }
}

/// Compact: `"3m5s"`, `"2h10m"`, `"4d3h"`.
/// Detail: `"3m 5s"`, `"2h 10m"`, `"4d 3h"`.
pub fn format_duration(secs: u64, style: FmtStyle) -> String {
    let sep = match style {
        FmtStyle::Compact => "",
        FmtStyle::Detail => " ",
    };
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}{}s", secs / 60, sep, secs % 60)
    } else if secs < 86400 {
        format!("{}h{}{}m", secs / 3600, sep, (secs % 3600) / 60)
    } else {
        format!("{}d{}{}h", secs / 86400, sep, (secs % 86400) / 3600)
    }
}

pub fn format_percent(value: f32) -> String {
    format!("{:.1}%", value)
}
