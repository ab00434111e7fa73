//! Date granularity model: [`Grain`] and [`RequestDate`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The granularity at which a date is specified.
///
/// `None` is reserved for non-temporal datasets or a completely absent date
/// specification; it never appears in a dataset's advertised supported
/// grains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grain {
    None,
    Annual,
    Monthly,
    Daily,
}

impl Grain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grain::None => "none",
            Grain::Annual => "year",
            Grain::Monthly => "month",
            Grain::Daily => "day",
        }
    }
}

impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single requested date, tagged implicitly by which fields are present.
///
/// Invariant: if `day` is `Some`, `month` must also be `Some`. `year` is
/// always present once a `RequestDate` is constructed at any non-`None`
/// grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDate {
    pub year: i32,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl RequestDate {
    pub fn annual(year: i32) -> Self {
        RequestDate {
            year,
            month: None,
            day: None,
        }
    }

    pub fn monthly(year: i32, month: u8) -> Self {
        RequestDate {
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn daily(year: i32, month: u8, day: u8) -> Self {
        RequestDate {
            year,
            month: Some(month),
            day: Some(day),
        }
    }

    /// The grain this date is expressed at.
    pub fn grain(&self) -> Grain {
        match (self.month, self.day) {
            (None, None) => Grain::Annual,
            (Some(_), None) => Grain::Monthly,
            (Some(_), Some(_)) => Grain::Daily,
            (None, Some(_)) => unreachable!("RequestDate invariant violated"),
        }
    }

    /// Convert to a `chrono::NaiveDate`, defaulting absent month/day to 1,
    /// matching `_requestDateAsDatetime` in the reference implementation.
    pub fn as_naive_date(&self) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1) as u32, self.day.unwrap_or(1) as u32)
            .expect("RequestDate components validated at construction")
    }
}

impl Ord for RequestDate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month.unwrap_or(0), self.day.unwrap_or(0)).cmp(&(
            other.year,
            other.month.unwrap_or(0),
            other.day.unwrap_or(0),
        ))
    }
}

impl PartialOrd for RequestDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RequestDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.day) {
            (None, None) => write!(f, "{}", self.year),
            (Some(m), None) => write!(f, "{}-{:02}", self.year, m),
            (Some(m), Some(d)) => write!(f, "{}-{:02}-{:02}", self.year, m, d),
            (None, Some(_)) => unreachable!("RequestDate invariant violated"),
        }
    }
}
