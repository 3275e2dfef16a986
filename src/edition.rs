use chrono::{Datelike, Days, NaiveDate};

/// Editions are counted monthly from March 2015 (edition 1)
const EPOCH_YEAR: i32 = 2015;

/// Before this day of the month, the previous month's edition is still open
const CUTOFF_DAY: u32 = 10;

/// Edition being prepared on `date`.
///
/// An edition covers two months and is published at the end of the second;
/// its number follows the second covered month. Until the 10th, work still
/// belongs to the edition whose second month just ended.
pub fn edition_for(date: NaiveDate) -> i64 {
    let reference = if date.day() < CUTOFF_DAY {
        date.with_day(1)
            .and_then(|first| first.checked_sub_days(Days::new(1)))
            .unwrap_or(date)
    } else {
        date
    };
    i64::from(reference.year() - EPOCH_YEAR) * 12 + i64::from(reference.month()) - 2
}
