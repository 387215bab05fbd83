//! Gate log timestamps and duration rendering

use std::time::Duration;

use chrono::{DateTime, Local};

/// Render a duration as `H:MM:SS[.ffffff]`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let micros = duration.subsec_micros();
    let base = format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    if micros == 0 {
        base
    } else {
        format!("{}.{:06}", base, micros)
    }
}

/// Render elapsed run time: whole seconds, and no hours field while under an hour
pub fn format_elapsed(elapsed: Duration) -> String {
    let rendered = format_duration(Duration::from_secs(elapsed.as_secs()));
    match rendered.strip_prefix("0:") {
        Some(rest) => rest.to_string(),
        None => rendered,
    }
}

/// Gate log line prefix, e.g. `gate: 18 Oct 2026 10:11:12(+01:02) BEGIN: `
pub fn timestamp(now: DateTime<Local>, elapsed: Option<Duration>, suffix: &str) -> String {
    let mut stamp = now.format("gate: %d %b %Y %H:%M:%S").to_string();
    if let Some(elapsed) = elapsed {
        stamp.push_str(&format!("(+{})", format_elapsed(elapsed)));
    }
    stamp.push_str(suffix);
    stamp
}
