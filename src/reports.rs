use crate::error::{EtlError, Result};
use crate::metrics::{aggregate, derive};
use crate::period::{filter, Period, PeriodType};
use crate::types::{DerivedBundle, MetricsBundle, Month, PeriodLabel, ReportPreviewRow, Row};
use crate::util::{format_number, round2};
use crate::ytd;
use log::debug;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One (customer, service type) line of a period report.
///
/// Raw sums are kept unrounded so slides can re-aggregate them; rounding and
/// the period prefix on field names are applied only when serializing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub customer: String,
    pub service_type: String,
    pub label: PeriodLabel,
    pub metrics: MetricsBundle,
    pub derived: DerivedBundle,
}

impl ReportRecord {
    pub fn new(
        customer: impl Into<String>,
        service_type: impl Into<String>,
        label: PeriodLabel,
        metrics: MetricsBundle,
    ) -> Self {
        Self {
            customer: customer.into(),
            service_type: service_type.into(),
            label,
            derived: derive(&metrics),
            metrics,
        }
    }

    /// Period-prefixed output key, e.g. `Jan 2024 Revenue`.
    pub fn key(&self, field: &str) -> String {
        format!("{} {}", self.label, field)
    }

    pub fn preview_row(&self) -> ReportPreviewRow {
        ReportPreviewRow {
            customer: self.customer.clone(),
            service_type: self.service_type.clone(),
            cost: format_number(self.metrics.cost, 2),
            target: format_number(self.metrics.target, 2),
            revenue: format_number(self.metrics.revenue, 2),
            receivables_collected: format_number(self.metrics.receivables_collected, 2),
            achievement_pct: format_number(self.derived.achievement_pct, 2),
            gross_profit_pct: format_number(self.derived.gross_profit_pct, 2),
            collection_rate_pct: format_number(self.derived.collection_rate_pct, 2),
        }
    }
}

impl Serialize for ReportRecord {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(9))?;
        map.serialize_entry("Customer", &self.customer)?;
        map.serialize_entry("Service_Type", &self.service_type)?;
        map.serialize_entry(&self.key("Cost"), &round2(self.metrics.cost))?;
        map.serialize_entry(&self.key("Target"), &round2(self.metrics.target))?;
        map.serialize_entry(&self.key("Revenue"), &round2(self.metrics.revenue))?;
        map.serialize_entry(
            &self.key("Receivables Collected"),
            &round2(self.metrics.receivables_collected),
        )?;
        map.serialize_entry(&self.key("Ach. %"), &self.derived.achievement_pct)?;
        map.serialize_entry(&self.key("Gross Profit %"), &self.derived.gross_profit_pct)?;
        map.serialize_entry(
            &self.key("Receivables Collected Rate %"),
            &self.derived.collection_rate_pct,
        )?;
        map.end()
    }
}

/// Group rows by (customer, service type) in sorted key order and emit one
/// record per group.
fn assemble<'a, I>(rows: I, label: &PeriodLabel) -> Vec<ReportRecord>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut groups: BTreeMap<(&str, &str), Vec<&Row>> = BTreeMap::new();
    for r in rows {
        groups
            .entry((r.customer.as_str(), r.service_type.as_str()))
            .or_default()
            .push(r);
    }
    groups
        .into_iter()
        .map(|((customer, service_type), group)| {
            debug!("{} {}/{}: {} rows", label, customer, service_type, group.len());
            ReportRecord::new(customer, service_type, label.clone(), aggregate(group))
        })
        .collect()
}

/// Year report where each pair's window ends at its last revenue month.
pub fn smart_ytd_report(rows: &[Row], year: i32) -> Vec<ReportRecord> {
    let label = Period::Year { year }.label();
    let pairs: BTreeSet<(&str, &str)> = rows
        .iter()
        .filter(|r| r.year == year)
        .map(|r| (r.customer.as_str(), r.service_type.as_str()))
        .collect();
    pairs
        .into_iter()
        .map(|(customer, service_type)| {
            let window = ytd::filter_smart_ytd(rows, customer, service_type, year);
            ReportRecord::new(customer, service_type, label.clone(), aggregate(window))
        })
        .collect()
}

/// Year report over every month of the year, no truncation.
pub fn plain_ytd_report(rows: &[Row], year: i32) -> Vec<ReportRecord> {
    let period = Period::Year { year };
    assemble(filter(rows, &period), &period.label())
}

/// Report for an already validated window. Year windows use the smart YTD rule.
pub fn report_for(rows: &[Row], period: &Period) -> Vec<ReportRecord> {
    match *period {
        Period::Year { year } => smart_ytd_report(rows, year),
        _ => assemble(filter(rows, period), &period.label()),
    }
}

/// Report for loose request arguments; bad month/quarter values fail with
/// `InvalidPeriod` before anything is aggregated.
pub fn generate_report(
    rows: &[Row],
    period_type: PeriodType,
    year: i32,
    month: Option<u32>,
    quarter: Option<u32>,
) -> Result<Vec<ReportRecord>> {
    let period = Period::new(period_type, year, month, quarter)?;
    Ok(report_for(rows, &period))
}

/// Export-friendly report name, e.g. `MTD_Jan_2024`, `QTD_Q1_2024`, `YTD_2024`.
pub fn report_name(period: &Period) -> String {
    format!(
        "{}_{}",
        period.period_type().to_date_code(),
        period.label().0.replace(' ', "_")
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedReport {
    pub name: String,
    pub records: Vec<ReportRecord>,
}

#[derive(Debug, Default)]
pub struct ReportBatch {
    pub reports: Vec<NamedReport>,
    pub failures: Vec<(String, EtlError)>,
}

/// Every MTD report up to `current_month`, every QTD report up to
/// `current_quarter`, then the YTD report.
///
/// An out-of-range `current_month` or `current_quarter` is recorded once in
/// `failures` and its run is capped at December or Q4; the rest of the batch
/// still runs.
pub fn generate_all_reports(
    rows: &[Row],
    year: i32,
    current_month: u32,
    current_quarter: u32,
) -> ReportBatch {
    let mut batch = ReportBatch::default();

    if let Err(e) = Period::new(PeriodType::Month, year, Some(current_month), None) {
        batch.failures.push((format!("MTD_{}", year), e));
    }
    if let Err(e) = Period::new(PeriodType::Quarter, year, None, Some(current_quarter)) {
        batch.failures.push((format!("QTD_{}", year), e));
    }

    let mut periods: Vec<Period> = Vec::new();
    for month in Month::ALL.iter().take(current_month.min(12) as usize) {
        periods.push(Period::Month {
            year,
            month: *month,
        });
    }
    for quarter in 1..=current_quarter.min(4) {
        periods.push(Period::Quarter { year, quarter });
    }
    periods.push(Period::Year { year });

    for period in periods {
        batch.reports.push(NamedReport {
            name: report_name(&period),
            records: report_for(rows, &period),
        });
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Month;

    fn row(customer: &str, service: &str, month: Month, target: f64, revenue: f64) -> Row {
        Row {
            customer: customer.to_string(),
            service_type: service.to_string(),
            year: 2024,
            month,
            cost: revenue / 2.0,
            target,
            revenue,
            receivables_collected: revenue / 4.0,
        }
    }

    #[test]
    fn sample_month_report_uses_prefixed_keys() {
        let rows = vec![Row {
            customer: "Cust A".to_string(),
            service_type: "Transport".to_string(),
            year: 2024,
            month: Month::Jan,
            cost: 50.0,
            target: 100.0,
            revenue: 80.0,
            receivables_collected: 40.0,
        }];
        let report = generate_report(&rows, PeriodType::Month, 2024, Some(1), None).unwrap();
        assert_eq!(report.len(), 1);

        let json = serde_json::to_value(&report[0]).unwrap();
        assert_eq!(json["Customer"], "Cust A");
        assert_eq!(json["Service_Type"], "Transport");
        assert_eq!(json["Jan 2024 Revenue"], 80.0);
        assert_eq!(json["Jan 2024 Ach. %"], 80.0);
        assert_eq!(json["Jan 2024 Gross Profit %"], 37.5);
        assert_eq!(json["Jan 2024 Receivables Collected Rate %"], 50.0);
        assert_eq!(json.as_object().unwrap().len(), 9);
    }

    #[test]
    fn groups_come_out_in_key_order() {
        let rows = vec![
            row("Zed", "Warehouses", Month::Apr, 1.0, 1.0),
            row("Acme", "Warehouses", Month::May, 1.0, 1.0),
            row("Acme", "Transportation", Month::Jun, 1.0, 1.0),
        ];
        let report = generate_report(&rows, PeriodType::Quarter, 2024, None, Some(2)).unwrap();
        let keys: Vec<(&str, &str)> = report
            .iter()
            .map(|r| (r.customer.as_str(), r.service_type.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Acme", "Transportation"),
                ("Acme", "Warehouses"),
                ("Zed", "Warehouses")
            ]
        );
        assert_eq!(report[0].label.0, "Q2 2024");
    }

    #[test]
    fn groups_without_rows_are_absent() {
        let rows = vec![row("Acme", "Warehouses", Month::Jan, 10.0, 5.0)];
        let report = generate_report(&rows, PeriodType::Month, 2024, Some(2), None).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn year_report_truncates_each_pair_separately() {
        let rows = vec![
            row("Acme", "Warehouses", Month::Jan, 100.0, 90.0),
            row("Acme", "Warehouses", Month::Feb, 100.0, 0.0),
            row("Beta", "Warehouses", Month::Jan, 100.0, 50.0),
            row("Beta", "Warehouses", Month::Feb, 100.0, 70.0),
        ];
        let report = generate_report(&rows, PeriodType::Year, 2024, None, None).unwrap();
        assert_eq!(report.len(), 2);
        // Acme stops at Jan, so Feb's target is excluded.
        assert_eq!(report[0].metrics.target, 100.0);
        assert_eq!(report[0].derived.achievement_pct, 90.0);
        assert_eq!(report[1].metrics.target, 200.0);
        assert_eq!(report[1].derived.achievement_pct, 60.0);

        let plain = plain_ytd_report(&rows, 2024);
        assert_eq!(plain[0].metrics.target, 200.0);
        assert_eq!(plain[0].derived.achievement_pct, 45.0);
    }

    #[test]
    fn invalid_request_is_an_error() {
        let rows = vec![row("Acme", "Warehouses", Month::Jan, 10.0, 5.0)];
        assert!(matches!(
            generate_report(&rows, PeriodType::Month, 2024, Some(13), None),
            Err(EtlError::InvalidPeriod(_))
        ));
        assert!(matches!(
            generate_report(&rows, PeriodType::Quarter, 2024, None, Some(0)),
            Err(EtlError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn batch_names_and_order() {
        let rows = vec![row("Acme", "Warehouses", Month::Jan, 10.0, 5.0)];
        let batch = generate_all_reports(&rows, 2024, 2, 1);
        let names: Vec<&str> = batch.reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["MTD_Jan_2024", "MTD_Feb_2024", "QTD_Q1_2024", "YTD_2024"]);
        assert!(batch.failures.is_empty());
        assert_eq!(batch.reports[0].records.len(), 1);
        assert!(batch.reports[1].records.is_empty());
    }

    #[test]
    fn bad_request_in_batch_does_not_stop_the_rest() {
        let rows = vec![row("Acme", "Warehouses", Month::Dec, 10.0, 5.0)];
        let batch = generate_all_reports(&rows, 2024, 13, 5);
        assert_eq!(batch.reports.len(), 12 + 4 + 1);
        let failed: Vec<&str> = batch.failures.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(failed, vec!["MTD_2024", "QTD_2024"]);
        assert_eq!(batch.reports[11].name, "MTD_Dec_2024");
    }

    #[test]
    fn huge_month_argument_is_one_failure() {
        let rows = vec![row("Acme", "Warehouses", Month::Dec, 10.0, 5.0)];
        let batch = generate_all_reports(&rows, 2024, u32::MAX, 4);
        assert_eq!(batch.reports.len(), 12 + 4 + 1);
        assert_eq!(batch.failures.len(), 1);
        assert!(matches!(batch.failures[0].1, EtlError::InvalidPeriod(_)));
        assert_eq!(batch.reports.last().unwrap().name, "YTD_2024");
    }

    #[test]
    fn zero_month_skips_mtd_but_keeps_the_rest() {
        let rows = vec![row("Acme", "Warehouses", Month::Jan, 10.0, 5.0)];
        let batch = generate_all_reports(&rows, 2024, 0, 1);
        let names: Vec<&str> = batch.reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["QTD_Q1_2024", "YTD_2024"]);
        assert_eq!(batch.failures.len(), 1);
    }
}
