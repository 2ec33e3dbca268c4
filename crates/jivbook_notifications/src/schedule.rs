//! Wall-clock schedules of the background jobs

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// When a recurring job fires, evaluated in a configured time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// At second zero of every minute.
    EveryMinute,
    DailyAt { hour: u32, minute: u32 },
    WeeklyAt {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

impl JobSchedule {
    /// The first fire time strictly after `now`.
    ///
    /// A local time that falls into a DST gap fires at the first valid instant
    /// after it; an ambiguous one fires at its earlier occurrence.
    pub fn next_after(&self, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        let (weekday, hour, minute) = match *self {
            JobSchedule::EveryMinute => return next_minute(now),
            JobSchedule::DailyAt { hour, minute } => (None, hour, minute),
            JobSchedule::WeeklyAt {
                weekday,
                hour,
                minute,
            } => (Some(weekday), hour, minute),
        };

        let today = now.with_timezone(&tz).date_naive();
        (0..=8)
            .filter_map(|offset| today.checked_add_signed(Duration::days(offset)))
            .filter(|date| weekday.map_or(true, |wanted| date.weekday() == wanted))
            .filter_map(|date| resolve_local(tz, date, hour, minute))
            .find(|candidate| *candidate > now)
            .unwrap_or_else(|| now + self.period())
    }

    /// Longest regular gap between two fires.
    pub fn period(&self) -> Duration {
        match self {
            JobSchedule::EveryMinute => Duration::minutes(1),
            JobSchedule::DailyAt { .. } => Duration::days(1),
            JobSchedule::WeeklyAt { .. } => Duration::weeks(1),
        }
    }

    /// Cron notation, for status reports.
    pub fn cron(&self) -> String {
        match self {
            JobSchedule::EveryMinute => "* * * * *".to_string(),
            JobSchedule::DailyAt { hour, minute } => format!("{} {} * * *", minute, hour),
            JobSchedule::WeeklyAt {
                weekday,
                hour,
                minute,
            } => format!(
                "{} {} * * {}",
                minute,
                hour,
                weekday.num_days_from_sunday()
            ),
        }
    }
}

fn next_minute(now: DateTime<Utc>) -> DateTime<Utc> {
    let next = (now.timestamp().div_euclid(60) + 1) * 60;
    DateTime::<Utc>::from_timestamp(next, 0).unwrap_or_else(|| now + Duration::minutes(1))
}

fn resolve_local(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let local = date.and_hms_opt(hour, minute, 0)?;
    match tz.from_local_datetime(&local) {
        LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            // skipped by a DST gap, which is at most one hour long
            let shifted = local + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|at| at.with_timezone(&Utc))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_every_minute() {
        let now = utc("2026-03-01T10:15:42Z");
        assert_eq!(
            JobSchedule::EveryMinute.next_after(now, Tz::UTC),
            utc("2026-03-01T10:16:00Z")
        );
        let on_the_minute = utc("2026-03-01T10:16:00Z");
        assert_eq!(
            JobSchedule::EveryMinute.next_after(on_the_minute, Tz::UTC),
            utc("2026-03-01T10:17:00Z")
        );
    }

    #[test]
    fn test_daily_midnight_in_zone() {
        let midnight = JobSchedule::DailyAt { hour: 0, minute: 0 };
        let now = utc("2026-06-10T20:00:00Z");
        assert_eq!(
            midnight.next_after(now, Tz::UTC),
            utc("2026-06-11T00:00:00Z")
        );
        // Kolkata is UTC+05:30, so local midnight of the 11th is 18:30Z on the 10th
        assert_eq!(
            midnight.next_after(utc("2026-06-10T12:00:00Z"), chrono_tz::Asia::Kolkata),
            utc("2026-06-10T18:30:00Z")
        );
    }

    #[test]
    fn test_weekly_sunday_two_am() {
        let weekly = JobSchedule::WeeklyAt {
            weekday: Weekday::Sun,
            hour: 2,
            minute: 0,
        };
        // 2026-10-16 is a Friday
        assert_eq!(
            weekly.next_after(utc("2026-10-16T09:00:00Z"), Tz::UTC),
            utc("2026-10-18T02:00:00Z")
        );
        assert_eq!(
            weekly.next_after(utc("2026-10-18T02:00:00Z"), Tz::UTC),
            utc("2026-10-25T02:00:00Z")
        );
        assert_eq!(weekly.cron(), "0 2 * * 0");
    }

    #[test]
    fn test_dst_gap_fires_after_the_gap() {
        let weekly = JobSchedule::WeeklyAt {
            weekday: Weekday::Sun,
            hour: 2,
            minute: 30,
        };
        // Europe/Zurich skips 02:00-03:00 local on 2026-03-29
        let next = weekly.next_after(utc("2026-03-28T12:00:00Z"), chrono_tz::Europe::Zurich);
        assert_eq!(next, utc("2026-03-29T01:30:00Z"));
    }
}
