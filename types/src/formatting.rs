//! Number formatting for console and report output.
//!
//! Totals and rates are shown in compact `K`/`M` form; ratios as
//! percentages with one decimal.

/// Format a large amount with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use resona_types::formatting::format_compact;
/// assert_eq!(format_compact(500), "500");
/// assert_eq!(format_compact(1_500), "1.50K");
/// assert_eq!(format_compact(2_250_000), "2.25M");
/// ```
pub fn format_compact(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Format a per-second rate. Fractions below 1000 keep one decimal.
pub fn format_rate(rate: f64) -> String {
    if !rate.is_finite() || rate <= 0.0 {
        return "0".to_string();
    }
    if rate >= 1_000.0 {
        format_compact(rate.round() as u64)
    } else {
        format!("{:.1}", rate)
    }
}

/// Format `count / total` as a percentage. Zero total yields `0.0%`.
pub fn format_pct_ratio(count: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", count as f64 / total as f64 * 100.0)
}

/// Format a millisecond duration as `m:ss` (or `h:mm:ss` past an hour).
pub fn format_duration_ms(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(0), "0");
        assert_eq!(format_compact(999), "999");
        assert_eq!(format_compact(1_000), "1.00K");
        assert_eq!(format_compact(15_000), "15.00K");
        assert_eq!(format_compact(1_500_000), "1.50M");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "0");
        assert_eq!(format_rate(f64::NAN), "0");
        assert_eq!(format_rate(12.34), "12.3");
        assert_eq!(format_rate(4_500.4), "4.50K");
    }

    #[test]
    fn test_format_pct_ratio() {
        assert_eq!(format_pct_ratio(0, 0), "0.0%");
        assert_eq!(format_pct_ratio(1, 4), "25.0%");
        assert_eq!(format_pct_ratio(2, 3), "66.7%");
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(0), "0:00");
        assert_eq!(format_duration_ms(65_400), "1:05");
        assert_eq!(format_duration_ms(3_725_000), "1:02:05");
        assert_eq!(format_duration_ms(-5), "0:00");
    }
}
