//! Human-readable playtime durations

/// Format a second count as an abbreviated playtime string.
///
/// - `3661` -> `"1h1m1s"`
/// - `7200` -> `"2h0m"` (zero seconds are omitted once hours or minutes show)
/// - `120` -> `"2m"`
/// - `45` -> `"45s"`
///
/// Anything that is not a non-negative integer formats as `"0s"`.
pub fn format_playtime<T: TryInto<u64>>(seconds: T) -> String {
    let Ok(seconds) = seconds.try_into() else {
        return "0s".to_string();
    };

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut out = if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        return format!("{}s", secs);
    };

    if secs != 0 {
        out.push_str(&format!("{}s", secs));
    }
    out
}
