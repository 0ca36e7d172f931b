//! Temporal vocabulary for subset requests.
//!
//! A request's temporal constraint is sparse: an explicit, ordered list of
//! calendar points at a single grain rather than a dense interval. The list
//! is built either from a start/end string pair or from combinatorial
//! year/month/day range expressions.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ranges::{parse_range, RangeParseError};

/// Temporal granularity, ordered coarse to fine.
///
/// `None` means no time axis at all (a non-temporal request or dataset).
/// The ordering is meaningful: grain reconciliation compares grains with
/// `<`/`>` to find coarser or finer alternatives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DateGrain {
    None,
    Annual,
    Monthly,
    Daily,
}

impl DateGrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateGrain::None => "none",
            DateGrain::Annual => "annual",
            DateGrain::Monthly => "monthly",
            DateGrain::Daily => "daily",
        }
    }
}

impl fmt::Display for DateGrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sparse calendar point: a year, optionally refined by month and day.
///
/// The populated fields match the owning selection's grain: annual dates
/// carry only a year, monthly dates a year and month, daily dates all
/// three. Dates are never constructed for grain `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RequestDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl RequestDate {
    pub fn annual(year: i32) -> Self {
        Self { year, month: None, day: None }
    }

    pub fn monthly(year: i32, month: u32) -> Self {
        Self { year, month: Some(month), day: None }
    }

    pub fn daily(year: i32, month: u32, day: u32) -> Self {
        Self { year, month: Some(month), day: Some(day) }
    }

    /// The grain implied by which fields are populated.
    pub fn grain(&self) -> DateGrain {
        match (self.month, self.day) {
            (Some(_), Some(_)) => DateGrain::Daily,
            (Some(_), None) => DateGrain::Monthly,
            _ => DateGrain::Annual,
        }
    }
}

impl fmt::Display for RequestDate {
    /// Renders `"YYYY"`, `"YYYY-MM"`, or `"YYYY-MM-DD"` by shape. Output
    /// file names embed this form, so it must stay stable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.day) {
            (Some(m), Some(d)) => write!(f, "{:04}-{:02}-{:02}", self.year, m, d),
            (Some(m), None) => write!(f, "{:04}-{:02}", self.year, m),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

/// An ordered, deduplicated list of request dates at a single grain.
///
/// The list is empty exactly when the grain is [`DateGrain::None`]; an
/// empty selection is a valid request with no temporal constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSelection {
    grain: DateGrain,
    dates: Vec<RequestDate>,
}

impl DateSelection {
    /// The selection with no temporal constraint.
    pub fn none() -> Self {
        Self { grain: DateGrain::None, dates: Vec::new() }
    }

    pub fn grain(&self) -> DateGrain {
        self.grain
    }

    pub fn dates(&self) -> &[RequestDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Build a selection from the raw request inputs.
    ///
    /// A present `date_start` or `date_end` selects the simple-range path
    /// and the combinatorial inputs are ignored. With no temporal inputs at
    /// all the selection is empty with grain `None`.
    pub fn from_request(
        date_start: Option<&str>,
        date_end: Option<&str>,
        years: Option<&str>,
        months: Option<&str>,
        days: Option<&str>,
    ) -> Result<Self, DateParseError> {
        let date_start = blank_to_none(date_start);
        let date_end = blank_to_none(date_end);
        let years = blank_to_none(years);
        let months = blank_to_none(months);
        let days = blank_to_none(days);

        if date_start.is_some() || date_end.is_some() {
            Self::from_simple_range(date_start, date_end)
        } else if years.is_some() || months.is_some() || days.is_some() {
            Self::from_components(years, months, days)
        } else {
            Ok(Self::none())
        }
    }

    /// Dense range between two date strings of equal shape.
    ///
    /// The string length decides the grain: `"YYYY"` (annual), `"YYYY-MM"`
    /// (monthly), `"YYYY-MM-DD"` (daily).
    pub fn from_simple_range(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, DateParseError> {
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(DateParseError::IncompleteRange),
        };

        match (start.len(), end.len()) {
            (4, 4) => Self::annual_range(start, end),
            (7, 7) => Self::monthly_range(start, end),
            (10, 10) => Self::daily_range(start, end),
            _ => Err(DateParseError::MismatchedGranularity {
                start: start.to_string(),
                end: end.to_string(),
            }),
        }
    }

    fn annual_range(start: &str, end: &str) -> Result<Self, DateParseError> {
        let start_year = parse_year(start)?;
        let end_year = parse_year(end)?;
        if end_year < start_year {
            return Err(DateParseError::end_before_start(start, end));
        }
        let dates = (start_year..=end_year).map(RequestDate::annual).collect();
        Self::build(DateGrain::Annual, dates)
    }

    fn monthly_range(start: &str, end: &str) -> Result<Self, DateParseError> {
        let (start_year, start_month) = parse_year_month(start)?;
        let (end_year, end_month) = parse_year_month(end)?;
        for month in [start_month, end_month] {
            if !(1..=12).contains(&month) {
                return Err(DateParseError::MonthOutOfRange(month));
            }
        }
        if (end_year, end_month) < (start_year, start_month) {
            return Err(DateParseError::end_before_start(start, end));
        }

        let mut dates = Vec::new();
        let (mut year, mut month) = (start_year, start_month);
        while (year, month) <= (end_year, end_month) {
            dates.push(RequestDate::monthly(year, month));
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        Self::build(DateGrain::Monthly, dates)
    }

    fn daily_range(start: &str, end: &str) -> Result<Self, DateParseError> {
        let start_day = parse_day(start)?;
        let end_day = parse_day(end)?;
        if end_day < start_day {
            return Err(DateParseError::end_before_start(start, end));
        }

        // Calendar walk, so month/year boundaries and leap days come out
        // right without any arithmetic here.
        let mut dates = Vec::new();
        let mut day = start_day;
        while day <= end_day {
            dates.push(RequestDate::daily(day.year(), day.month(), day.day()));
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        Self::build(DateGrain::Daily, dates)
    }

    /// Sparse selection from year/month/day-of-year range expressions.
    ///
    /// `years` is mandatory; `months` and `days` refine it and are mutually
    /// exclusive. Day values are interpreted as day-of-year, and day 366 is
    /// silently dropped for non-leap years.
    pub fn from_components(
        years: Option<&str>,
        months: Option<&str>,
        days: Option<&str>,
    ) -> Result<Self, DateParseError> {
        let years = match years {
            Some(expr) => parse_range(expr, None)?,
            None => return Err(DateParseError::MissingYears),
        };

        match (months, days) {
            (Some(_), Some(_)) => Err(DateParseError::MonthsAndDays),
            (Some(expr), None) => {
                let months = parse_range(expr, Some(12))?;
                let mut dates = Vec::with_capacity(years.len() * months.len());
                for year in &years {
                    for month in &months {
                        dates.push(RequestDate::monthly(*year as i32, *month));
                    }
                }
                Self::build(DateGrain::Monthly, dates)
            }
            (None, Some(expr)) => {
                let days = parse_range(expr, Some(366))?;
                let mut dates = Vec::new();
                for year in &years {
                    for day_of_year in &days {
                        if let Some(day) = NaiveDate::from_yo_opt(*year as i32, *day_of_year) {
                            dates.push(RequestDate::daily(day.year(), day.month(), day.day()));
                        }
                    }
                }
                Self::build(DateGrain::Daily, dates)
            }
            (None, None) => {
                let dates = years.iter().map(|y| RequestDate::annual(*y as i32)).collect();
                Self::build(DateGrain::Annual, dates)
            }
        }
    }

    fn build(grain: DateGrain, mut dates: Vec<RequestDate>) -> Result<Self, DateParseError> {
        dates.sort();
        dates.dedup();
        if dates.is_empty() {
            // Only reachable when every day-of-year candidate was dropped;
            // an empty list must always mean grain `None`.
            return Err(DateParseError::EmptySelection);
        }
        Ok(Self { grain, dates })
    }
}

fn blank_to_none(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_year(s: &str) -> Result<i32, DateParseError> {
    s.parse()
        .map_err(|_| DateParseError::InvalidDate(s.to_string()))
}

fn parse_year_month(s: &str) -> Result<(i32, u32), DateParseError> {
    let invalid = || DateParseError::InvalidDate(s.to_string());
    let (year, month) = s.split_once('-').ok_or_else(invalid)?;
    Ok((
        year.parse().map_err(|_| invalid())?,
        month.parse().map_err(|_| invalid())?,
    ))
}

fn parse_day(s: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| DateParseError::InvalidDate(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("Invalid date string: {0}")]
    InvalidDate(String),
    #[error("Mismatched starting and ending date granularity: {start}, {end}")]
    MismatchedGranularity { start: String, end: String },
    #[error("Start and end dates must both be specified")]
    IncompleteRange,
    #[error("End date cannot precede start date: {start}, {end}")]
    EndBeforeStart { start: String, end: String },
    #[error("Month out of range [1, 12]: {0}")]
    MonthOutOfRange(u32),
    #[error("Years are required when months or days are given")]
    MissingYears,
    #[error("Months and days cannot be combined in one selection")]
    MonthsAndDays,
    #[error("Date selection matched no calendar dates")]
    EmptySelection,
    #[error(transparent)]
    Range(#[from] RangeParseError),
}

impl DateParseError {
    fn end_before_start(start: &str, end: &str) -> Self {
        DateParseError::EndBeforeStart {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grain_ordering() {
        assert!(DateGrain::None < DateGrain::Annual);
        assert!(DateGrain::Annual < DateGrain::Monthly);
        assert!(DateGrain::Monthly < DateGrain::Daily);
    }

    #[test]
    fn test_request_date_display() {
        assert_eq!(RequestDate::annual(2020).to_string(), "2020");
        assert_eq!(RequestDate::monthly(2020, 3).to_string(), "2020-03");
        assert_eq!(RequestDate::daily(2020, 3, 7).to_string(), "2020-03-07");
    }

    #[test]
    fn test_annual_range_count() {
        let sel = DateSelection::from_simple_range(Some("1980"), Some("1995")).unwrap();
        assert_eq!(sel.grain(), DateGrain::Annual);
        assert_eq!(sel.len(), 16);
        assert_eq!(sel.dates()[0], RequestDate::annual(1980));
        assert_eq!(sel.dates()[15], RequestDate::annual(1995));
        assert!(sel.dates().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_monthly_range_year_carry() {
        let sel = DateSelection::from_simple_range(Some("2020-11"), Some("2021-02")).unwrap();
        assert_eq!(sel.grain(), DateGrain::Monthly);
        assert_eq!(
            sel.dates(),
            &[
                RequestDate::monthly(2020, 11),
                RequestDate::monthly(2020, 12),
                RequestDate::monthly(2021, 1),
                RequestDate::monthly(2021, 2),
            ]
        );
    }

    #[test]
    fn test_daily_range_crosses_leap_day() {
        let sel =
            DateSelection::from_simple_range(Some("2020-02-27"), Some("2020-03-01")).unwrap();
        assert_eq!(sel.grain(), DateGrain::Daily);
        assert_eq!(
            sel.dates(),
            &[
                RequestDate::daily(2020, 2, 27),
                RequestDate::daily(2020, 2, 28),
                RequestDate::daily(2020, 2, 29),
                RequestDate::daily(2020, 3, 1),
            ]
        );
    }

    #[test]
    fn test_daily_range_rejects_invalid_date() {
        let err = DateSelection::from_simple_range(Some("2021-02-29"), Some("2021-03-01"));
        assert!(matches!(err, Err(DateParseError::InvalidDate(_))));
    }

    #[test]
    fn test_mismatched_shapes() {
        let err = DateSelection::from_simple_range(Some("2020"), Some("2020-05"));
        assert!(matches!(
            err,
            Err(DateParseError::MismatchedGranularity { .. })
        ));
    }

    #[test]
    fn test_missing_endpoint() {
        let err = DateSelection::from_request(Some("2020"), None, None, None, None);
        assert!(matches!(err, Err(DateParseError::IncompleteRange)));
        let err = DateSelection::from_request(None, Some("2020"), None, None, None);
        assert!(matches!(err, Err(DateParseError::IncompleteRange)));
    }

    #[test]
    fn test_end_before_start() {
        for (start, end) in [
            ("2021", "2020"),
            ("2021-02", "2021-01"),
            ("2021-02-02", "2021-02-01"),
        ] {
            let err = DateSelection::from_simple_range(Some(start), Some(end));
            assert!(
                matches!(err, Err(DateParseError::EndBeforeStart { .. })),
                "expected end-before-start for {start}..{end}"
            );
        }
    }

    #[test]
    fn test_month_out_of_range() {
        let err = DateSelection::from_simple_range(Some("2020-13"), Some("2021-01"));
        assert!(matches!(err, Err(DateParseError::MonthOutOfRange(13))));
    }

    #[test]
    fn test_components_years_only() {
        let sel = DateSelection::from_components(Some("2019-2021"), None, None).unwrap();
        assert_eq!(sel.grain(), DateGrain::Annual);
        assert_eq!(
            sel.dates(),
            &[
                RequestDate::annual(2019),
                RequestDate::annual(2020),
                RequestDate::annual(2021),
            ]
        );
    }

    #[test]
    fn test_components_years_and_months() {
        let sel = DateSelection::from_components(Some("2019-2020"), Some("1-3+2"), None).unwrap();
        assert_eq!(sel.grain(), DateGrain::Monthly);
        assert_eq!(
            sel.dates(),
            &[
                RequestDate::monthly(2019, 1),
                RequestDate::monthly(2019, 3),
                RequestDate::monthly(2020, 1),
                RequestDate::monthly(2020, 3),
            ]
        );
    }

    #[test]
    fn test_components_day_of_year_leap_handling() {
        let sel =
            DateSelection::from_components(Some("2019-2020"), None, Some("365-366")).unwrap();
        assert_eq!(sel.grain(), DateGrain::Daily);
        // 2019 is not a leap year, so its day 366 drops out.
        assert_eq!(
            sel.dates(),
            &[
                RequestDate::daily(2019, 12, 31),
                RequestDate::daily(2020, 12, 30),
                RequestDate::daily(2020, 12, 31),
            ]
        );
    }

    #[test]
    fn test_components_all_days_dropped() {
        let err = DateSelection::from_components(Some("2021-2021"), None, Some("366-366"));
        assert!(matches!(err, Err(DateParseError::EmptySelection)));
    }

    #[test]
    fn test_components_require_years() {
        let err = DateSelection::from_components(None, Some("1-12"), None);
        assert!(matches!(err, Err(DateParseError::MissingYears)));
    }

    #[test]
    fn test_components_months_days_exclusive() {
        let err = DateSelection::from_components(Some("2020-2021"), Some("1-6"), Some("1-31"));
        assert!(matches!(err, Err(DateParseError::MonthsAndDays)));
    }

    #[test]
    fn test_month_range_bound() {
        let err = DateSelection::from_components(Some("2020-2020"), Some("1-13"), None);
        assert!(matches!(
            err,
            Err(DateParseError::Range(RangeParseError::ExceedsMax { .. }))
        ));
    }

    #[test]
    fn test_no_temporal_inputs() {
        let sel = DateSelection::from_request(None, None, None, None, None).unwrap();
        assert_eq!(sel.grain(), DateGrain::None);
        assert!(sel.is_empty());

        // Blank strings count as absent
        let sel = DateSelection::from_request(Some(""), Some("  "), None, None, None).unwrap();
        assert_eq!(sel.grain(), DateGrain::None);
    }

    #[test]
    fn test_simple_range_takes_precedence() {
        let sel = DateSelection::from_request(
            Some("2020"),
            Some("2021"),
            Some("1990-1999"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(sel.grain(), DateGrain::Annual);
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.dates()[0].year, 2020);
    }
}
