//! Calendar month arithmetic for report windows

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A calendar month (the unit of every trend bucket)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Build a month, rejecting anything outside 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(Error::Validation(format!(
                "Invalid month: {}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month (29 February in leap years)
    pub fn last_day(&self) -> NaiveDate {
        self.succ()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// `count` consecutive months ending at (and including) `self`, oldest first
    pub fn window_ending(&self, count: usize) -> Vec<YearMonth> {
        let mut months = Vec::with_capacity(count);
        let mut current = *self;
        for _ in 0..count {
            months.push(current);
            current = current.pred();
        }
        months.reverse();
        months
    }

    /// Human-readable label, e.g. "February 2024"
    pub fn label(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_handles_leap_years() {
        assert_eq!(
            YearMonth::new(2024, 2).unwrap().last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            YearMonth::new(2023, 2).unwrap().last_day(),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            YearMonth::new(1900, 2).unwrap().last_day(),
            NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()
        );
        assert_eq!(
            YearMonth::new(2024, 12).unwrap().last_day(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(matches!(YearMonth::new(2024, 0), Err(Error::Validation(_))));
        assert!(matches!(YearMonth::new(2024, 13), Err(Error::Validation(_))));
    }

    #[test]
    fn test_window_crosses_year_boundary() {
        let window = YearMonth::new(2024, 2).unwrap().window_ending(4);
        let labels: Vec<String> = window.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_empty_window() {
        assert!(YearMonth::new(2024, 2).unwrap().window_ending(0).is_empty());
    }

    #[test]
    fn test_label() {
        assert_eq!(YearMonth::new(2024, 3).unwrap().label(), "March 2024");
    }
}
