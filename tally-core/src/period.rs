//! Calendar periods used by budgets and search queries.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

/// A specific period in history, e.g. week 2 of 2022.
///
/// `number` is 1-12 for months, 1-4 for quarters, 1-53 for ISO weeks and
/// 1-366 for days of the year; a year period carries no number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    period_type: PeriodType,
    year: i32,
    number: Option<u32>,
}

impl Period {
    pub fn new(period_type: PeriodType, year: i32, number: Option<u32>) -> Result<Self> {
        if period_type != PeriodType::Year && number.is_none() {
            return Err(LedgerError::Validation(
                "period number must be set when the period type is not a year".to_string(),
            ));
        }
        Ok(Self {
            period_type,
            year,
            number,
        })
    }

    pub fn year(year: i32) -> Self {
        Self {
            period_type: PeriodType::Year,
            year,
            number: None,
        }
    }

    pub fn period_type(&self) -> PeriodType {
        self.period_type
    }

    /// True if `date` falls within this period's span.
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        if date.year() != self.year {
            return false;
        }
        match self.period_type {
            PeriodType::Year => true,
            PeriodType::Quarter => Some(date.month0() / 3 + 1) == self.number,
            PeriodType::Month => Some(date.month()) == self.number,
            PeriodType::Week => Some(date.iso_week().week()) == self.number,
            PeriodType::Day => Some(date.ordinal()) == self.number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn year_period_spans_the_whole_year() {
        let period = Period::year(2021);
        assert!(period.contains(date(2021, 1, 1)));
        assert!(period.contains(date(2021, 12, 31)));
        assert!(!period.contains(date(2022, 1, 1)));
    }

    #[test]
    fn quarter_and_month_periods_match_their_span() {
        let q4 = Period::new(PeriodType::Quarter, 2021, Some(4)).unwrap();
        assert!(q4.contains(date(2021, 10, 1)));
        assert!(q4.contains(date(2021, 12, 31)));
        assert!(!q4.contains(date(2021, 9, 30)));

        let november = Period::new(PeriodType::Month, 2021, Some(11)).unwrap();
        assert!(november.contains(date(2021, 11, 15)));
        assert!(!november.contains(date(2021, 10, 15)));
        assert!(!november.contains(date(2022, 11, 15)));
    }

    #[test]
    fn week_period_uses_iso_weeks() {
        // 2022-01-12 is a Wednesday in ISO week 2.
        let week2 = Period::new(PeriodType::Week, 2022, Some(2)).unwrap();
        assert!(week2.contains(date(2022, 1, 12)));
        assert!(!week2.contains(date(2022, 1, 3)));
    }

    #[test]
    fn day_period_uses_the_day_of_year() {
        let day32 = Period::new(PeriodType::Day, 2021, Some(32)).unwrap();
        assert!(day32.contains(date(2021, 2, 1)));
        assert!(!day32.contains(date(2021, 2, 2)));
    }

    #[test]
    fn non_year_periods_require_a_number() {
        let err = Period::new(PeriodType::Month, 2021, None).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert!(Period::new(PeriodType::Year, 2021, None).is_ok());
    }

    #[test]
    fn periods_serialize_with_stable_names() {
        let period = Period::new(PeriodType::Month, 2021, Some(11)).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(
            json,
            r#"{"period_type":"month","year":2021,"number":11}"#
        );
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }
}
