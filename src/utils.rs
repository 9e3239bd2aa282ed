/// Format a remaining-time value as "2d 3h 4m", "57s" for sub-minute spans,
/// or "Expired" once it reaches zero.
pub fn format_time(seconds: i64) -> String {
    if seconds <= 0 {
        return "Expired".to_string();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }

    if parts.is_empty() {
        return format!("{}s", seconds);
    }

    parts.join(" ")
}

/// Format an address truncated for display: `0x1234...abcd`.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 {
        address.to_string()
    } else {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    }
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "Expired");
        assert_eq!(format_time(-5), "Expired");
        assert_eq!(format_time(45), "45s");
        assert_eq!(format_time(60), "1m");
        assert_eq!(format_time(600), "10m");
        assert_eq!(format_time(3_660), "1h 1m");
        assert_eq!(format_time(90_061), "1d 1h 1m");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(
            format_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(format_address("0xabc"), "0xabc");
    }
}
