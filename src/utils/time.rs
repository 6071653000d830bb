use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::CalendarError;
use crate::models::candidate::TimeSlot;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Absolute start and end of `slot` on `date` in `zone`. An end hour of 24
/// rolls over to 00:00 of the following day.
pub fn slot_window(
    date: NaiveDate,
    slot: TimeSlot,
    zone: Tz,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), CalendarError> {
    let start = local_hour(date, slot.start_hour(), zone)?;
    let end = if slot.end_hour() >= 24 {
        let next_day = date
            .succ_opt()
            .ok_or_else(|| CalendarError::InvalidTime(format!("no day after {}", date)))?;
        local_hour(next_day, slot.end_hour() - 24, zone)?
    } else {
        local_hour(date, slot.end_hour(), zone)?
    };
    Ok((start, end))
}

fn local_hour(date: NaiveDate, hour: u32, zone: Tz) -> Result<DateTime<FixedOffset>, CalendarError> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| CalendarError::InvalidTime(format!("{} {}:00", date, hour)))?;
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&dt.offset().fix()))
        .ok_or_else(|| CalendarError::InvalidTime(format!("{} {}:00 in {}", date, hour, zone)))
}
