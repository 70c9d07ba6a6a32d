//! Split date/time components and their composite string forms.
//!
//! # Invariants
//! - A zero component means "absent" (SQL `NULL` scans as zero).
//! - Composite strings never invent components that are absent.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Year through second, as stored across six integer columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateParts {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
}

impl DateParts {
    pub fn is_empty(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    /// `Y-MM-DD HH:MM:SS` when any time component is set, `Y-MM-DD`
    /// for date-only values, empty when the year is absent.
    pub fn timestamp(&self) -> String {
        if self.year <= 0 {
            return String::new();
        }
        if self.hour > 0 || self.minute > 0 || self.second > 0 {
            return format!(
                "{}-{:02}-{:02} {:02}:{:02}:{:02}",
                self.year, self.month, self.day, self.hour, self.minute, self.second
            );
        }
        format!("{}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// Joins whichever of year, month and day are present.
    pub fn approx_date(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if self.year > 0 {
            parts.push(self.year.to_string());
        }
        if self.month > 0 {
            parts.push(format!("{:02}", self.month));
        }
        if self.day > 0 {
            parts.push(format!("{:02}", self.day));
        }
        parts.join("-")
    }

    /// `Y-MM-DD` only when all three date components are present.
    pub fn full_date(&self) -> String {
        if self.year > 0 && self.month > 0 && self.day > 0 {
            format!("{}-{:02}-{:02}", self.year, self.month, self.day)
        } else {
            String::new()
        }
    }

    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; anything else yields empty parts.
    pub fn from_approx(src: &str) -> Self {
        let src = src.trim();
        let parsed = match src.len() {
            4 => NaiveDate::parse_from_str(&format!("{src}-01-01"), "%Y-%m-%d")
                .ok()
                .map(|d| (d.year(), 0, 0)),
            7 => NaiveDate::parse_from_str(&format!("{src}-01"), "%Y-%m-%d")
                .ok()
                .map(|d| (d.year(), d.month(), 0)),
            10 => NaiveDate::parse_from_str(src, "%Y-%m-%d")
                .ok()
                .map(|d| (d.year(), d.month(), d.day())),
            _ => None,
        };
        match parsed {
            Some((year, month, day)) => Self {
                year: i64::from(year),
                month: i64::from(month),
                day: i64::from(day),
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    /// Parses `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD`.
    pub fn from_timestamp(src: &str) -> Option<Self> {
        let src = src.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(src, "%Y-%m-%d %H:%M:%S") {
            return Some(Self::from_datetime(dt));
        }
        NaiveDate::parse_from_str(src, "%Y-%m-%d")
            .ok()
            .map(|d| Self {
                year: i64::from(d.year()),
                month: i64::from(d.month()),
                day: i64::from(d.day()),
                ..Self::default()
            })
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            year: i64::from(dt.year()),
            month: i64::from(dt.month()),
            day: i64::from(dt.day()),
            hour: i64::from(dt.hour()),
            minute: i64::from(dt.minute()),
            second: i64::from(dt.second()),
        }
    }
}
