//! Output formatting utilities

use std::time::Duration;

use console::{style, Style};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// `[HH:MM:SS] ` prefix for timed build logs
pub fn time_prefix() -> String {
    format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
}

/// Render a duration as `M:SS`
pub fn minutes_seconds(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// `s` when `count` is not one
pub fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_seconds() {
        assert_eq!(minutes_seconds(Duration::from_secs(5)), "0:05");
        assert_eq!(minutes_seconds(Duration::from_millis(125_900)), "2:05");
    }

    #[test]
    fn test_time_prefix_shape() {
        let prefix = time_prefix();
        assert_eq!(prefix.len(), "[00:00:00] ".len());
        assert!(prefix.starts_with('[') && prefix.ends_with("] "));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(2), "s");
    }
}
