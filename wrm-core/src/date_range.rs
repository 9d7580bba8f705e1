use chrono::{NaiveDate, TimeDelta};
use std::mem::replace;

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl DateRange {
    /// The `days` dates strictly after `anchor`: `anchor + 1 ..= anchor + days`.
    ///
    /// Forecast horizons are laid out this way, starting the day after the
    /// last observation. `days == 0` yields an empty range.
    pub fn following(anchor: NaiveDate, days: usize) -> DateRange {
        let start = wrm_utils::dates::days_after(&anchor, 1);
        if days == 0 {
            return DateRange(start, anchor);
        }
        let end = wrm_utils::dates::days_after(&anchor, days as i64);
        DateRange(start, end)
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = match TimeDelta::try_days(1).and_then(|d| self.0.checked_add_signed(d)) {
                Some(next) => next,
                None => {
                    // end of the calendar: emit the last date and close the range
                    let last = self.0;
                    self.1 = NaiveDate::MIN;
                    return Some(last);
                }
            };
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}
