pub mod balances;
pub mod movements;
pub mod stock;
pub mod transfers;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Half-open UTC interval `[start, end)` covering one calendar day.
pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("valid midnight"));
    let end = start + chrono::Duration::days(1);
    (start, end)
}
