use chrono::{DateTime, Datelike, Utc};

/// Format timestamp with tiered display:
/// - Relative for <7 days: "2h ago", "3d ago"
/// - Absolute for ≥7 days: "Jan 15", "Dec 3, 2024"
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    format_timestamp_at(timestamp, &Utc::now())
}

/// Same as [`format_timestamp`] against an explicit "now"
pub fn format_timestamp_at(timestamp: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(*timestamp);

    if duration.num_days() < 7 {
        format_relative(duration.num_seconds())
    } else if timestamp.year() == now.year() {
        timestamp.format("%b %-d").to_string()
    } else {
        timestamp.format("%b %-d, %Y").to_string()
    }
}

fn format_relative(seconds: i64) -> String {
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d ago", days)
    } else if hours > 0 {
        format!("{}h ago", hours)
    } else if minutes > 0 {
        format!("{}m ago", minutes)
    } else {
        "just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_tiers() {
        let now = now();
        assert_eq!(format_timestamp_at(&(now - Duration::seconds(30)), &now), "just now");
        assert_eq!(format_timestamp_at(&(now - Duration::minutes(45)), &now), "45m ago");
        assert_eq!(format_timestamp_at(&(now - Duration::hours(3)), &now), "3h ago");
        assert_eq!(format_timestamp_at(&(now - Duration::days(5)), &now), "5d ago");
    }

    #[test]
    fn test_absolute_same_year() {
        let now = now();
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap();
        assert_eq!(format_timestamp_at(&ts, &now), "Jan 15");
    }

    #[test]
    fn test_absolute_different_year() {
        let now = now();
        let ts = Utc.with_ymd_and_hms(2024, 12, 3, 8, 0, 0).unwrap();
        assert_eq!(format_timestamp_at(&ts, &now), "Dec 3, 2024");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let now = now();
        assert_eq!(format_timestamp_at(&(now + Duration::hours(2)), &now), "just now");
    }
}
