//! Period windows (month, quarter, plain year) and the row filter over them.

use crate::error::{EtlError, Result};
use crate::types::{Month, PeriodLabel, Row};
use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum PeriodType {
    Month,
    Quarter,
    Year,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Month => "month",
            PeriodType::Quarter => "quarter",
            PeriodType::Year => "year",
        }
    }

    /// Dashboard shorthand: MTD, QTD or YTD.
    pub fn to_date_code(self) -> &'static str {
        match self {
            PeriodType::Month => "MTD",
            PeriodType::Quarter => "QTD",
            PeriodType::Year => "YTD",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Month { year: i32, month: Month },
    Quarter { year: i32, quarter: u32 },
    /// The whole calendar year (plain YTD).
    Year { year: i32 },
}

impl Period {
    /// Build a window from loose request arguments.
    ///
    /// `month` is required (1-12) for month windows and `quarter` (1-4) for
    /// quarter windows; anything else is `InvalidPeriod`.
    pub fn new(
        period_type: PeriodType,
        year: i32,
        month: Option<u32>,
        quarter: Option<u32>,
    ) -> Result<Period> {
        match period_type {
            PeriodType::Month => {
                let m = month.ok_or_else(|| {
                    EtlError::InvalidPeriod("month period requires a month".to_string())
                })?;
                let month = Month::from_number(m).ok_or_else(|| {
                    EtlError::InvalidPeriod(format!("month {} is outside 1-12", m))
                })?;
                Ok(Period::Month { year, month })
            }
            PeriodType::Quarter => {
                let q = quarter.ok_or_else(|| {
                    EtlError::InvalidPeriod("quarter period requires a quarter".to_string())
                })?;
                if !(1..=4).contains(&q) {
                    return Err(EtlError::InvalidPeriod(format!(
                        "quarter {} is outside 1-4",
                        q
                    )));
                }
                Ok(Period::Quarter { year, quarter: q })
            }
            PeriodType::Year => Ok(Period::Year { year }),
        }
    }

    pub fn period_type(&self) -> PeriodType {
        match self {
            Period::Month { .. } => PeriodType::Month,
            Period::Quarter { .. } => PeriodType::Quarter,
            Period::Year { .. } => PeriodType::Year,
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            Period::Month { year, .. } | Period::Quarter { year, .. } | Period::Year { year } => {
                year
            }
        }
    }

    pub fn label(&self) -> PeriodLabel {
        PeriodLabel(match self {
            Period::Month { year, month } => format!("{} {}", month, year),
            Period::Quarter { year, quarter } => format!("Q{} {}", quarter, year),
            Period::Year { year } => format!("{}", year),
        })
    }

    /// Months the window covers, in calendar order.
    pub fn months(&self) -> Vec<Month> {
        match *self {
            Period::Month { month, .. } => vec![month],
            // A hand-built out-of-range quarter covers nothing.
            Period::Quarter { quarter, .. } => quarter_months(quarter).unwrap_or_default(),
            Period::Year { .. } => Month::ALL.to_vec(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Months of a calendar quarter, or `None` outside 1-4.
pub fn quarter_months(quarter: u32) -> Option<Vec<Month>> {
    if !(1..=4).contains(&quarter) {
        return None;
    }
    let start = ((quarter - 1) * 3) as usize;
    Some(Month::ALL[start..start + 3].to_vec())
}

/// Rows falling inside `period`, in source order.
pub fn filter<'a>(rows: &'a [Row], period: &Period) -> Vec<&'a Row> {
    let year = period.year();
    let months = period.months();
    rows.iter()
        .filter(|r| r.year == year && months.contains(&r.month))
        .collect()
}

/// Validate loose arguments and filter in one step.
pub fn filter_by_period<'a>(
    rows: &'a [Row],
    period_type: PeriodType,
    year: i32,
    month: Option<u32>,
    quarter: Option<u32>,
) -> Result<Vec<&'a Row>> {
    let period = Period::new(period_type, year, month, quarter)?;
    Ok(filter(rows, &period))
}
