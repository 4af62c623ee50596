use chrono::{Datelike, NaiveDate};

use crate::analysis::month::Month;

/**
Splits a date into its calendar year and month.
 */
pub fn year_month(date: &NaiveDate) -> (i32, Month) {
    // chrono months are always 1..=12
    let month = Month::from_number(date.month()).unwrap_or(Month::Jan);
    (date.year(), month)
}

/**
Last calendar day of the given month.

## Returns
`None` only for years outside chrono's supported range.
 */
pub fn month_end(year: i32, month: Month) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == Month::Dec {
        (year + 1, 1)
    } else {
        (year, month.number() + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}
