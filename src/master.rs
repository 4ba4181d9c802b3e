//! Master table populator.
//!
//! Source sheets arrive as JSON exports in "wide" form: one object per
//! customer with a `Jan`..`Dec` column per month and a note saying which
//! master-table metric the sheet holds. This module pivots them into the long
//! master table the loader reads (one row per customer, service, month).

use crate::error::{EtlError, Result};
use crate::metrics::derive;
use crate::types::{Month, MetricsBundle, Row};
use crate::util::{parse_f64_safe, round2};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cost,
    Target,
    Revenue,
    ReceivablesCollected,
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cost" => Ok(Metric::Cost),
            "target" => Ok(Metric::Target),
            "revenue" => Ok(Metric::Revenue),
            "receivables collected" => Ok(Metric::ReceivablesCollected),
            other => Err(format!("unknown master table column '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(rename = "Customer")]
    customer: String,
    #[serde(rename = "Service_Type")]
    service_type: String,
    #[serde(rename = "Relevant column in master table")]
    metric: String,
    #[serde(flatten)]
    months: HashMap<String, Value>,
}

/// Amount cell as exported: `"1,234.50"`, a bare number, `""` or `null`.
fn cell_amount(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64_safe(Some(s.as_str())),
        _ => None,
    }
}

/// One master-table line; `None` amounts are written as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterRow {
    #[serde(rename = "Customer")]
    pub customer: String,
    #[serde(rename = "Service_Type")]
    pub service_type: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: Month,
    #[serde(rename = "Cost")]
    pub cost: Option<f64>,
    #[serde(rename = "Target")]
    pub target: Option<f64>,
    #[serde(rename = "Revenue")]
    pub revenue: Option<f64>,
    #[serde(rename = "Receivables Collected")]
    pub receivables_collected: Option<f64>,
}

impl MasterRow {
    fn slot(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Cost => &mut self.cost,
            Metric::Target => &mut self.target,
            Metric::Revenue => &mut self.revenue,
            Metric::ReceivablesCollected => &mut self.receivables_collected,
        }
    }

    /// The row as the loader would read it back, blanks as zero.
    pub fn to_row(&self) -> Row {
        Row {
            customer: self.customer.clone(),
            service_type: self.service_type.clone(),
            year: self.year,
            month: self.month,
            cost: self.cost.unwrap_or(0.0),
            target: self.target.unwrap_or(0.0),
            revenue: self.revenue.unwrap_or(0.0),
            receivables_collected: self.receivables_collected.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Default)]
pub struct PopulateReport {
    pub merged_sources: usize,
    pub failed_sources: Vec<(PathBuf, EtlError)>,
}

fn read_source(path: &Path) -> Result<Vec<(Metric, SourceRecord)>> {
    let text = std::fs::read_to_string(path)?;
    let records: Vec<SourceRecord> = serde_json::from_str(&text)?;
    records
        .into_iter()
        .map(|r| -> Result<(Metric, SourceRecord)> {
            let metric = r
                .metric
                .parse::<Metric>()
                .map_err(|reason| EtlError::InvalidSource {
                    path: path.to_path_buf(),
                    reason,
                })?;
            Ok((metric, r))
        })
        .collect()
}

/// Merge wide monthly sources into master rows for `year`.
///
/// Every source customer gets all twelve months. When two sources fill the
/// same metric of the same row, the first one wins. A source that cannot be
/// read is logged and recorded in the report; the others still merge.
/// Rows come back sorted by customer, service type, then calendar month.
pub fn populate(sources: &[PathBuf], year: i32) -> (Vec<MasterRow>, PopulateReport) {
    let mut report = PopulateReport::default();
    let mut table: BTreeMap<(String, String, Month), MasterRow> = BTreeMap::new();

    for path in sources {
        info!("Processing: {}", path.display());
        let records = match read_source(path) {
            Ok(r) => r,
            Err(e) => {
                error!("Error processing {}: {}", path.display(), e);
                report.failed_sources.push((path.clone(), e));
                continue;
            }
        };
        for (metric, record) in records {
            let customer = record.customer.trim().to_string();
            let service_type = record.service_type.trim().to_string();
            for month in Month::ALL {
                let row = table
                    .entry((customer.clone(), service_type.clone(), month))
                    .or_insert_with(|| MasterRow {
                        customer: customer.clone(),
                        service_type: service_type.clone(),
                        year,
                        month,
                        cost: None,
                        target: None,
                        revenue: None,
                        receivables_collected: None,
                    });
                let value = record.months.get(month.abbrev()).and_then(cell_amount);
                let slot = row.slot(metric);
                if slot.is_none() {
                    *slot = value;
                }
            }
        }
        report.merged_sources += 1;
    }

    let rows: Vec<MasterRow> = table.into_values().collect();
    info!(
        "Master table populated: {} records from {} sources",
        rows.len(),
        report.merged_sources
    );
    (rows, report)
}

/// Per (customer, service type) totals over the master rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterSummaryRow {
    #[serde(rename = "Customer")]
    pub customer: String,
    #[serde(rename = "Service_Type")]
    pub service_type: String,
    #[serde(rename = "Total_Cost")]
    pub total_cost: f64,
    #[serde(rename = "Total_Target")]
    pub total_target: f64,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "Receivables Collected")]
    pub receivables_collected: Option<f64>,
    #[serde(rename = "Achievement")]
    pub achievement: Option<f64>,
    #[serde(rename = "Gross Profit %")]
    pub gross_profit_pct: Option<f64>,
    #[serde(rename = "Receivables Collected Rate")]
    pub receivables_rate: Option<f64>,
}

/// Summary sheet rows. Ratios are blank, not zero, when the denominator is
/// zero; the collection rate is blank until some receivables are filled in.
pub fn summarize(rows: &[MasterRow]) -> Vec<MasterSummaryRow> {
    let mut groups: BTreeMap<(&str, &str), (MetricsBundle, bool)> = BTreeMap::new();
    for r in rows {
        let (totals, has_receivables) = groups
            .entry((r.customer.as_str(), r.service_type.as_str()))
            .or_default();
        let row = r.to_row();
        totals.add(&MetricsBundle {
            cost: row.cost,
            target: row.target,
            revenue: row.revenue,
            receivables_collected: row.receivables_collected,
        });
        *has_receivables |= r.receivables_collected.is_some();
    }

    groups
        .into_iter()
        .map(|((customer, service_type), (m, has_receivables))| {
            let d = derive(&m);
            MasterSummaryRow {
                customer: customer.to_string(),
                service_type: service_type.to_string(),
                total_cost: round2(m.cost),
                total_target: round2(m.target),
                total_revenue: round2(m.revenue),
                receivables_collected: has_receivables.then(|| round2(m.receivables_collected)),
                achievement: (m.target > 0.0).then_some(d.achievement_pct),
                gross_profit_pct: (m.revenue > 0.0).then_some(d.gross_profit_pct),
                receivables_rate: (has_receivables && m.revenue > 0.0)
                    .then_some(d.collection_rate_pct),
            }
        })
        .collect()
}
