#[cfg(test)]
mod tests {
    use crate::models::DeliveryTally;
    use crate::schedule::JobSchedule;
    use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
    use chrono_tz::Tz;
    use jivbook_common::services::{MulticastResult, TokenSendResponse, DeliveryFailure};
    use proptest::prelude::*;

    const ZONES: [Tz; 5] = [
        Tz::UTC,
        Tz::Europe__Zurich,
        Tz::Asia__Kolkata,
        Tz::America__New_York,
        Tz::Australia__Lord_Howe,
    ];

    fn schedules() -> impl Strategy<Value = JobSchedule> {
        prop_oneof![
            Just(JobSchedule::EveryMinute),
            (0..24u32, 0..60u32).prop_map(|(hour, minute)| JobSchedule::DailyAt { hour, minute }),
            (0..7u8, 0..24u32, 0..60u32).prop_map(|(day, hour, minute)| JobSchedule::WeeklyAt {
                weekday: Weekday::try_from(day).unwrap_or(Weekday::Sun),
                hour,
                minute,
            }),
        ]
    }

    // Mock a batch result where the first `delivered` tokens succeed
    fn batch_result(len: usize, delivered: usize) -> MulticastResult {
        let responses = (0..len)
            .map(|i| {
                if i < delivered {
                    TokenSendResponse::delivered(format!("tok-{}", i), format!("m-{}", i))
                } else {
                    TokenSendResponse::failed(
                        format!("tok-{}", i),
                        DeliveryFailure {
                            code: "UNAVAILABLE".into(),
                            message: "try later".into(),
                            invalid_token: false,
                        },
                    )
                }
            })
            .collect();
        MulticastResult::from_responses(responses)
    }

    proptest! {
        #[test]
        fn test_next_fire_is_after_now_and_within_one_period(
            secs in 0i64..4_000_000_000i64,
            zone in 0..ZONES.len(),
            schedule in schedules(),
        ) {
            let now = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            let tz = ZONES[zone];

            let next = schedule.next_after(now, tz);

            prop_assert!(next > now);
            // one extra hour covers a DST transition between now and the fire time
            prop_assert!(next - now <= schedule.period() + Duration::hours(1));
            prop_assert_eq!(next.second(), 0);
        }

        #[test]
        fn test_weekly_fires_on_its_weekday(
            secs in 0i64..4_000_000_000i64,
            zone in 0..ZONES.len(),
            day in 0..7u8,
        ) {
            let now = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            let tz = ZONES[zone];
            let weekday = Weekday::try_from(day).unwrap();
            let schedule = JobSchedule::WeeklyAt { weekday, hour: 2, minute: 0 };

            let next = schedule.next_after(now, tz);

            prop_assert_eq!(next.with_timezone(&tz).weekday(), weekday);
        }

        #[test]
        fn test_batching_accounts_for_every_token(
            total in 0usize..3_000,
            batch_size in 1usize..=500,
            failing in proptest::collection::vec(any::<bool>(), 0..8),
            delivered_ratio in 0.0f64..=1.0,
        ) {
            let tokens: Vec<usize> = (0..total).collect();
            let mut tally = DeliveryTally::default();

            for (index, batch) in tokens.chunks(batch_size).enumerate() {
                if failing.get(index).copied().unwrap_or(false) {
                    tally.record(batch.len(), Err("provider unavailable".to_string()));
                } else {
                    let delivered = (batch.len() as f64 * delivered_ratio) as usize;
                    tally.record(batch.len(), Ok(&batch_result(batch.len(), delivered)));
                }
            }

            prop_assert_eq!(tally.batches, total.div_ceil(batch_size));
            prop_assert_eq!((tally.successful + tally.failed) as usize, total);
            prop_assert_eq!(tally.stats().total_targeted as usize, total);
        }
    }
}
