use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("Posting hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),
}

/// Daily posting slot at a fixed local hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingSchedule {
    tz: Tz,
    hour: u32,
}

impl PostingSchedule {
    pub fn new(timezone: &str, hour: u32) -> Result<Self, ScheduleError> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|e| ScheduleError::InvalidTimezone(format!("{timezone}: {e}")))?;
        if hour > 23 {
            return Err(ScheduleError::InvalidHour(hour));
        }

        Ok(PostingSchedule { tz, hour })
    }

    /// First slot strictly after `now`
    pub fn next_slot(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = now.with_timezone(&self.tz).date_naive();
        let slot_time = NaiveTime::from_hms_opt(self.hour, 0, 0).unwrap_or(NaiveTime::MIN);

        (0..=2)
            .filter_map(|days| {
                let naive = (local_date + Duration::days(days)).and_time(slot_time);
                match self.tz.from_local_datetime(&naive) {
                    LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => Some(at),
                    // the hour does not exist that day, post right after the gap
                    LocalResult::None => self
                        .tz
                        .from_local_datetime(&(naive + Duration::hours(1)))
                        .earliest(),
                }
            })
            .map(|at| at.with_timezone(&Utc))
            .find(|at| *at > now)
            .unwrap_or_else(|| now + Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_slot_later_today() {
        let schedule = PostingSchedule::new("Africa/Nairobi", 16).unwrap();
        // 13:00 in Nairobi
        let next = schedule.next_slot(utc(2026, 1, 20, 10, 0));
        assert_eq!(next, utc(2026, 1, 20, 13, 0));
    }

    #[test]
    fn test_slot_rolls_over_to_tomorrow() {
        let schedule = PostingSchedule::new("Africa/Nairobi", 16).unwrap();

        assert_eq!(schedule.next_slot(utc(2026, 1, 20, 14, 0)), utc(2026, 1, 21, 13, 0));
        // exactly on the slot
        assert_eq!(schedule.next_slot(utc(2026, 1, 20, 13, 0)), utc(2026, 1, 21, 13, 0));
    }

    #[test]
    fn test_slot_across_local_midnight() {
        let schedule = PostingSchedule::new("America/New_York", 9).unwrap();
        // 2026-01-21 02:00 UTC is still the 20th in New York
        assert_eq!(schedule.next_slot(utc(2026, 1, 21, 2, 0)), utc(2026, 1, 21, 14, 0));
    }

    #[test]
    fn test_slot_inside_dst_gap() {
        // 02:00 does not exist on 2026-03-08 in New York
        let schedule = PostingSchedule::new("America/New_York", 2).unwrap();
        assert_eq!(schedule.next_slot(utc(2026, 3, 8, 5, 0)), utc(2026, 3, 8, 7, 0));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            PostingSchedule::new("Mars/Olympus", 9),
            Err(ScheduleError::InvalidTimezone(_))
        ));
        assert!(matches!(
            PostingSchedule::new("UTC", 24),
            Err(ScheduleError::InvalidHour(24))
        ));
    }
}
