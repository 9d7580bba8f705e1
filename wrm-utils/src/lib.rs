//! Shared utility functions for WRM crates.

/// Date utility functions
pub mod dates {
    use chrono::{NaiveDate, TimeDelta};

    /// ISO calendar date format used for every date the toolkit emits.
    pub const ISO_FORMAT: &str = "%Y-%m-%d";

    /// Compact date format accepted on input ("YYYYMMDD").
    pub const COMPACT_FORMAT: &str = "%Y%m%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(ISO_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), ISO_FORMAT)?)
    }

    /// Parse a date string in "YYYYMMDD" format
    pub fn parse_date_compact(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), COMPACT_FORMAT)?)
    }

    /// Parse either "YYYY-MM-DD" or "YYYYMMDD".
    pub fn parse_date_any(s: &str) -> anyhow::Result<NaiveDate> {
        if s.contains('-') {
            parse_date(s)
        } else {
            parse_date_compact(s)
        }
    }

    /// The date `days` days after `date`. Saturates at the calendar maximum.
    pub fn days_after(date: &NaiveDate, days: i64) -> NaiveDate {
        TimeDelta::try_days(days)
            .and_then(|delta| date.checked_add_signed(delta))
            .unwrap_or(NaiveDate::MAX)
    }

}
