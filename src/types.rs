use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// Calendar month. Ordering follows the calendar, never the abbreviation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

// Lowercased abbreviations and full English names.
static MONTH_LOOKUP: Lazy<HashMap<String, Month>> = Lazy::new(|| {
    const FULL: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let mut map = HashMap::new();
    for (month, full) in Month::ALL.iter().zip(FULL) {
        map.insert(month.abbrev().to_lowercase(), *month);
        map.insert(full.to_string(), *month);
    }
    map
});

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Jan,
        Month::Feb,
        Month::Mar,
        Month::Apr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Aug,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dec,
    ];

    pub fn abbrev(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }

    /// 1-based month number (Jan = 1).
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_number(n: u32) -> Option<Month> {
        if (1..=12).contains(&n) {
            Some(Month::ALL[(n - 1) as usize])
        } else {
            None
        }
    }

    pub fn quarter(self) -> u32 {
        (self.number() - 1) / 3 + 1
    }

    /// Jan..=self in calendar order.
    pub fn up_to(self) -> Vec<Month> {
        Month::ALL[..self.number() as usize].to_vec()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MONTH_LOOKUP
            .get(&s.trim().to_lowercase())
            .copied()
            .ok_or_else(|| format!("unknown month '{}'", s.trim()))
    }
}

/// One master-table row exactly as it appears in the source file.
#[derive(Debug, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Customer")]
    pub customer: Option<String>,
    #[serde(rename = "Service_Type")]
    pub service_type: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Month")]
    pub month: Option<String>,
    #[serde(rename = "Cost")]
    pub cost: Option<String>,
    #[serde(rename = "Target")]
    pub target: Option<String>,
    #[serde(rename = "Revenue")]
    pub revenue: Option<String>,
    #[serde(rename = "Receivables Collected")]
    pub receivables_collected: Option<String>,
}

/// Header names the loader requires, in master-table order.
pub const MASTER_COLUMNS: [&str; 8] = [
    "Customer",
    "Service_Type",
    "Year",
    "Month",
    "Cost",
    "Target",
    "Revenue",
    "Receivables Collected",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub customer: String,
    pub service_type: String,
    pub year: i32,
    pub month: Month,
    pub cost: f64,
    pub target: f64,
    pub revenue: f64,
    pub receivables_collected: f64,
}

/// Sums of the four raw amounts over some set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsBundle {
    pub cost: f64,
    pub target: f64,
    pub revenue: f64,
    pub receivables_collected: f64,
}

impl MetricsBundle {
    pub fn add(&mut self, other: &MetricsBundle) {
        self.cost += other.cost;
        self.target += other.target;
        self.revenue += other.revenue;
        self.receivables_collected += other.receivables_collected;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedBundle {
    pub achievement_pct: f64,
    pub gross_profit_pct: f64,
    pub collection_rate_pct: f64,
}

/// Human readable period prefix: `Jan 2024`, `Q2 2024` or `2024`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PeriodLabel(pub String);

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ReportPreviewRow {
    #[tabled(rename = "Customer")]
    pub customer: String,
    #[tabled(rename = "Service_Type")]
    pub service_type: String,
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[tabled(rename = "Target")]
    pub target: String,
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[tabled(rename = "Receivables")]
    pub receivables_collected: String,
    #[tabled(rename = "Ach. %")]
    pub achievement_pct: String,
    #[tabled(rename = "GP %")]
    pub gross_profit_pct: String,
    #[tabled(rename = "Coll. %")]
    pub collection_rate_pct: String,
}
