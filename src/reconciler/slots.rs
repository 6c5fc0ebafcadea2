use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

use crate::models::TimeSlot;

/// First bookable hour of the day (inclusive).
pub const OPENING_HOUR: u32 = 6;
/// End of the operating window (exclusive).
pub const CLOSING_HOUR: u32 = 22;
pub const SLOTS_PER_DAY: usize = (CLOSING_HOUR - OPENING_HOUR) as usize;
/// Days offered for booking, starting today.
pub const BOOKING_HORIZON_DAYS: u32 = 7;

/// One slot per whole hour from 06:00 to 21:00 local time on `date`.
pub fn generate_slots<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Vec<TimeSlot> {
    let midnight = date.and_time(NaiveTime::MIN);

    (OPENING_HOUR..CLOSING_HOUR)
        .map(|hour| {
            let local = midnight + Duration::hours(i64::from(hour));
            TimeSlot {
                label: local.format("%H:%M").to_string(),
                timestamp: local_timestamp(&local, tz),
            }
        })
        .collect()
}

/// Epoch seconds of a wall-clock time. Ambiguous times take the earlier
/// instant; times skipped by a DST jump use the offset in force just after.
fn local_timestamp<Tz: TimeZone>(local: &NaiveDateTime, tz: &Tz) -> i64 {
    match tz.from_local_datetime(local).earliest() {
        Some(instant) => instant.timestamp(),
        None => {
            let offset = tz.offset_from_utc_datetime(local).fix();
            (*local - Duration::seconds(i64::from(offset.local_minus_utc())))
                .and_utc()
                .timestamp()
        }
    }
}

pub fn today_in<Tz: TimeZone>(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// `today` and the following days up to the booking horizon.
pub fn upcoming_dates(today: NaiveDate) -> Vec<NaiveDate> {
    today
        .iter_days()
        .take(BOOKING_HORIZON_DAYS as usize)
        .collect()
}
