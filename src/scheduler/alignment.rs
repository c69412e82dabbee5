//! Wall-clock alignment of the two cadences.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike};

/// The next top of the hour strictly after `now`.
pub fn next_hour_boundary<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let local = now.naive_local();
    let hour_start = local
        .date()
        .and_hms_opt(local.hour(), 0, 0)
        .unwrap_or(local);
    resolve_local(now, hour_start + Duration::hours(1))
}

/// The next local midnight strictly after `now`.
pub fn next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let local = now.naive_local();
    let tomorrow = local.date() + Duration::days(1);
    let midnight = tomorrow.and_hms_opt(0, 0, 0).unwrap_or(local + Duration::days(1));
    resolve_local(now, midnight)
}

/// Time from `now` until `target`, zero if `target` has passed.
pub fn delay_until<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> std::time::Duration {
    (target.clone() - now.clone())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

// A local time inside a DST gap does not exist; the first instant after the
// gap stands in for it.
fn resolve_local<Tz: TimeZone>(now: &DateTime<Tz>, target: NaiveDateTime) -> DateTime<Tz> {
    let tz = now.timezone();
    tz.from_local_datetime(&target)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(target + Duration::hours(1))).earliest())
        .unwrap_or_else(|| now.clone() + Duration::hours(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_hour_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 13, 47, 12).unwrap();
        let next = next_hour_boundary(&now);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 5, 4, 14, 0, 0).unwrap());
        assert_eq!(delay_until(&now, &next), std::time::Duration::from_secs(12 * 60 + 48));
    }

    #[test]
    fn test_exact_boundary_moves_to_next_hour() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 14, 0, 0).unwrap();
        assert_eq!(
            next_hour_boundary(&now),
            Utc.with_ymd_and_hms(2026, 5, 4, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_hour_boundary_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(
            next_hour_boundary(&now),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_midnight_uses_local_offset() {
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = tz.with_ymd_and_hms(2026, 5, 4, 13, 47, 0).unwrap();
        let next = next_midnight(&now);
        assert_eq!(next, tz.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap());
        // Half-hour offsets still align to local hours.
        assert_eq!(
            next_hour_boundary(&now),
            tz.with_ymd_and_hms(2026, 5, 4, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_delay_never_negative() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 13, 0, 0).unwrap();
        let past = now - Duration::minutes(5);
        assert_eq!(delay_until(&now, &past), std::time::Duration::ZERO);
    }
}
