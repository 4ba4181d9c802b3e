use crate::slides::SlideContext;
use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "Master_Table.xlsx";

/// Settings for one report run.
///
/// Year, month and quarter left unset on the command line fall back to the
/// run date. The default quarter is the run date's quarter even when a
/// month is given explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
}

impl RunConfig {
    pub fn resolve(
        input: PathBuf,
        out_dir: PathBuf,
        year: Option<i32>,
        month: Option<u32>,
        quarter: Option<u32>,
        today: NaiveDate,
    ) -> Self {
        let month = month.unwrap_or_else(|| today.month());
        let quarter = quarter.unwrap_or_else(|| today.month0() / 3 + 1);
        Self {
            input,
            out_dir,
            year: year.unwrap_or_else(|| today.year()),
            month,
            quarter,
        }
    }

    pub fn slide_context(&self) -> SlideContext {
        SlideContext {
            year: self.year,
            month: self.month,
            quarter: self.quarter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fills_period_from_run_date() {
        let cfg = RunConfig::resolve(
            PathBuf::from(DEFAULT_INPUT),
            PathBuf::from("."),
            None,
            None,
            None,
            date(2025, 8, 14),
        );
        assert_eq!(cfg.year, 2025);
        assert_eq!(cfg.month, 8);
        assert_eq!(cfg.quarter, 3);
    }

    #[test]
    fn explicit_values_win() {
        let cfg = RunConfig::resolve(
            PathBuf::from("in.csv"),
            PathBuf::from("out"),
            Some(2023),
            Some(2),
            Some(4),
            date(2025, 8, 14),
        );
        assert_eq!(cfg.year, 2023);
        assert_eq!(cfg.month, 2);
        assert_eq!(cfg.quarter, 4);
        assert_eq!(
            cfg.slide_context(),
            SlideContext {
                year: 2023,
                month: 2,
                quarter: 4
            }
        );
    }
}
