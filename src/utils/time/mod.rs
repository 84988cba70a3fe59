// Time utility functions
// Countdown breakdown and formatting with floor division at every unit

const MS_PER_SECOND: i64 = 1000;
const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Remaining time split into whole days, hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeBreakdown {
    /// Truncates sub-second precision; negative input counts as zero.
    pub fn from_millis(ms: i64) -> Self {
        let total_seconds = ms.max(0) / MS_PER_SECOND;
        Self {
            days: total_seconds / SECONDS_PER_DAY,
            hours: (total_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
            minutes: (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            seconds: total_seconds % SECONDS_PER_MINUTE,
        }
    }
}

/// Formats a remaining duration using its two or three most significant units:
/// `"{d}d {h}h {m}m"`, `"{h}h {m}m {s}s"`, `"{m}m {s}s"` or `"{s}s"`.
pub fn format_time_remaining(ms: i64) -> String {
    let t = TimeBreakdown::from_millis(ms);

    if t.days > 0 {
        format!("{}d {}h {}m", t.days, t.hours, t.minutes)
    } else if t.hours > 0 {
        format!("{}h {}m {}s", t.hours, t.minutes, t.seconds)
    } else if t.minutes > 0 {
        format!("{}m {}s", t.minutes, t.seconds)
    } else {
        format!("{}s", t.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(90_000, "1m 30s" ; "minutes and seconds")]
    #[test_case(3_661_000, "1h 1m 1s" ; "hours minutes seconds")]
    #[test_case(90_000_000, "1d 1h 0m" ; "days drop seconds")]
    #[test_case(59_999, "59s" ; "truncates to whole seconds")]
    #[test_case(999, "0s" ; "under one second")]
    #[test_case(0, "0s" ; "zero")]
    #[test_case(-5_000, "0s" ; "negative clamps to zero")]
    #[test_case(86_399_999, "23h 59m 59s" ; "just under a day")]
    fn test_format_time_remaining(ms: i64, expected: &str) {
        assert_eq!(format_time_remaining(ms), expected);
    }

    #[test]
    fn test_breakdown_floors_each_unit() {
        let t = TimeBreakdown::from_millis(2 * 86_400_000 + 3 * 3_600_000 + 4 * 60_000 + 5_999);
        assert_eq!(
            t,
            TimeBreakdown {
                days: 2,
                hours: 3,
                minutes: 4,
                seconds: 5,
            }
        );
    }
}
