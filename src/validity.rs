//! License validity periods and expiration arithmetic.
//!
//! Every license row stores a duration (`validaty`) and a unit
//! (`validaty_unit`). When a request for that license is approved the
//! expiration is "now" advanced by that period:
//!
//! | unit | meaning |
//! |------|---------|
//! | 1    | days    |
//! | 2    | months  |
//! | 3    | years   |
//!
//! Month and year arithmetic is calendar based. When the target month is
//! shorter than the starting day-of-month the result is clamped to the last
//! day of that month, so `Jan 31 + 1 month` is `Feb 28` (or `Feb 29`).

use std::fmt;

use chrono::{Days, Months, NaiveDateTime};
use crate::errors::{DeskError, DeskResult};

/// Unit qualifying a license's validity duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityUnit {
    Days,
    Months,
    Years,
}

impl ValidityUnit {
    /// Map the integer code stored in `licenses.validaty_unit`.
    pub fn from_code(code: i32) -> DeskResult<Self> {
        match code {
            1 => Ok(ValidityUnit::Days),
            2 => Ok(ValidityUnit::Months),
            3 => Ok(ValidityUnit::Years),
            other => Err(DeskError::InvalidValidityUnit(other)),
        }
    }
}

impl fmt::Display for ValidityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidityUnit::Days => "days",
            ValidityUnit::Months => "months",
            ValidityUnit::Years => "years",
        };
        write!(f, "{}", s)
    }
}

/// A validity period as stored on a license row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub duration: i32,
    pub unit: ValidityUnit,
}

impl ValidityPeriod {
    /// Build a period from the raw `(validaty, validaty_unit)` columns.
    ///
    /// Fails with `InvalidValidityUnit` for unknown unit codes and with
    /// `InvalidValidityPeriod` for negative durations.
    pub fn from_raw(duration: i32, unit_code: i32) -> DeskResult<Self> {
        let unit = ValidityUnit::from_code(unit_code)?;
        if duration < 0 {
            return Err(DeskError::InvalidValidityPeriod(duration));
        }
        Ok(Self { duration, unit })
    }

    /// Advance `from` by this period.
    pub fn expiration_from(&self, from: NaiveDateTime) -> DeskResult<NaiveDateTime> {
        let overflow = || DeskError::InvalidValidityPeriod(self.duration);
        let amount = u32::try_from(self.duration).map_err(|_| overflow())?;

        match self.unit {
            ValidityUnit::Days => from.checked_add_days(Days::new(u64::from(amount))),
            ValidityUnit::Months => from.checked_add_months(Months::new(amount)),
            ValidityUnit::Years => amount
                .checked_mul(12)
                .and_then(|months| from.checked_add_months(Months::new(months))),
        }
        .ok_or_else(overflow)
    }
}

impl fmt::Display for ValidityPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.duration, self.unit)
    }
}
