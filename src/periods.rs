use crate::error::{ReportError, Result};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime};

/// A Monday-anchored 7-day calendar range used for period-over-period
/// analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingWindow {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    #[must_use]
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// The two comparison windows for one run: `current` is the last full
/// week before the reference date's own week, `prior` the week before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonWindows {
    pub current: ReportingWindow,
    pub prior: ReportingWindow,
}

/// Anchor date for window resolution. Strings must be strict `YYYY-MM-DD`;
/// datetimes are truncated to their calendar date.
#[derive(Debug, Clone)]
pub enum ReferenceDate {
    Today,
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl From<NaiveDate> for ReferenceDate {
    fn from(date: NaiveDate) -> Self {
        ReferenceDate::Date(date)
    }
}

impl From<NaiveDateTime> for ReferenceDate {
    fn from(datetime: NaiveDateTime) -> Self {
        ReferenceDate::DateTime(datetime)
    }
}

impl From<&str> for ReferenceDate {
    fn from(text: &str) -> Self {
        ReferenceDate::Text(text.to_string())
    }
}

impl ReferenceDate {
    pub fn resolve(&self) -> Result<NaiveDate> {
        match self {
            ReferenceDate::Today => Ok(Local::now().date_naive()),
            ReferenceDate::Date(date) => Ok(*date),
            ReferenceDate::DateTime(datetime) => Ok(datetime.date()),
            ReferenceDate::Text(text) => parse_reference_date(text),
        }
    }
}

pub fn parse_reference_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDate(text.to_string()))
}

/// Monday of the week the date falls in.
#[must_use]
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

impl ComparisonWindows {
    /// Resolves the window pair for a reference date. Both windows are
    /// always exactly 7 days, whatever weekday the reference falls on.
    pub fn resolve(reference: impl Into<ReferenceDate>) -> Result<Self> {
        let anchor = reference.into().resolve()?;
        Ok(Self::for_date(anchor))
    }

    #[must_use]
    pub fn for_date(reference: NaiveDate) -> Self {
        let monday = week_monday(reference);
        let current = ReportingWindow {
            start: monday - Days::new(7),
            end: monday - Days::new(1),
        };
        let prior = ReportingWindow {
            start: monday - Days::new(14),
            end: monday - Days::new(8),
        };
        Self { current, prior }
    }

    /// The longer lookback window used for daily timelines, ending at the
    /// current window's end.
    #[must_use]
    pub fn rolling_horizon(&self, days: u32) -> ReportingWindow {
        let span = days.max(1) as u64;
        ReportingWindow {
            start: self.current.end - Days::new(span - 1),
            end: self.current.end,
        }
    }
}
