//! Dashboard slides built by regrouping period reports.
//!
//! Whenever records are combined, percentages are re-derived from the summed
//! raw amounts. Averaging per-group percentages would weight a tiny customer
//! the same as a large one.

use crate::error::Result;
use crate::metrics::derive;
use crate::output::write_json;
use crate::period::{Period, PeriodType};
use crate::reports::{plain_ytd_report, report_for, ReportRecord};
use crate::types::{MetricsBundle, PeriodLabel, Row};
use crate::util::round2;
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// The "current" windows the MTD and QTD slide blocks refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideContext {
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
}

impl SlideContext {
    fn month_period(&self) -> Result<Period> {
        Period::new(PeriodType::Month, self.year, Some(self.month), None)
    }

    fn quarter_period(&self) -> Result<Period> {
        Period::new(PeriodType::Quarter, self.year, None, Some(self.quarter))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideMetrics {
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "Target")]
    pub target: f64,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "Receivables Collected")]
    pub receivables_collected: f64,
    #[serde(rename = "Ach. %")]
    pub achievement_pct: f64,
    #[serde(rename = "Gross Profit %")]
    pub gross_profit_pct: f64,
    #[serde(rename = "Receivables Collected Rate %")]
    pub collection_rate_pct: f64,
}

impl SlideMetrics {
    /// Percentages recomputed from the totals.
    pub fn from_totals(m: &MetricsBundle) -> Self {
        let d = derive(m);
        Self {
            cost: round2(m.cost),
            target: round2(m.target),
            revenue: round2(m.revenue),
            receivables_collected: round2(m.receivables_collected),
            achievement_pct: d.achievement_pct,
            gross_profit_pct: d.gross_profit_pct,
            collection_rate_pct: d.collection_rate_pct,
        }
    }

    /// Percentages copied from a single record as-is.
    pub fn from_record(r: &ReportRecord) -> Self {
        Self {
            cost: round2(r.metrics.cost),
            target: round2(r.metrics.target),
            revenue: round2(r.metrics.revenue),
            receivables_collected: round2(r.metrics.receivables_collected),
            achievement_pct: r.derived.achievement_pct,
            gross_profit_pct: r.derived.gross_profit_pct,
            collection_rate_pct: r.derived.collection_rate_pct,
        }
    }
}

fn sum_records<'a, I>(records: I) -> MetricsBundle
where
    I: IntoIterator<Item = &'a ReportRecord>,
{
    let mut total = MetricsBundle::default();
    for r in records {
        total.add(&r.metrics);
    }
    total
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBlock {
    #[serde(rename = "Period")]
    pub period: PeriodLabel,
    #[serde(flatten)]
    pub metrics: SlideMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingAchievement {
    #[serde(rename = "Period")]
    pub period: PeriodLabel,
    #[serde(flatten)]
    pub metrics: SlideMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessUnitLanding {
    #[serde(rename = "Service_Type")]
    pub service_type: String,
    #[serde(rename = "Period")]
    pub period: PeriodLabel,
    #[serde(flatten)]
    pub metrics: SlideMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessUnitPeriod {
    #[serde(rename = "Service_Type")]
    pub service_type: String,
    /// MTD, QTD or YTD.
    #[serde(rename = "Period_Type")]
    pub period_type: String,
    #[serde(flatten)]
    pub block: PeriodBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerAchievement {
    #[serde(rename = "Customer")]
    pub customer: String,
    #[serde(rename = "QTD", skip_serializing_if = "Option::is_none")]
    pub qtd: Option<PeriodBlock>,
    #[serde(rename = "YTD", skip_serializing_if = "Option::is_none")]
    pub ytd: Option<PeriodBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerServiceAchievement {
    #[serde(rename = "Customer")]
    pub customer: String,
    #[serde(rename = "Service_Type")]
    pub service_type: String,
    #[serde(rename = "QTD", skip_serializing_if = "Option::is_none")]
    pub qtd: Option<PeriodBlock>,
    #[serde(rename = "YTD", skip_serializing_if = "Option::is_none")]
    pub ytd: Option<PeriodBlock>,
}

/// Slide 1: company-wide plain YTD totals.
pub fn landing_achievement(rows: &[Row], year: i32) -> LandingAchievement {
    let report = plain_ytd_report(rows, year);
    LandingAchievement {
        period: Period::Year { year }.label(),
        metrics: SlideMetrics::from_totals(&sum_records(&report)),
    }
}

/// Slide 2: plain YTD totals per service type.
pub fn business_unit_landing(rows: &[Row], year: i32) -> Vec<BusinessUnitLanding> {
    let label = Period::Year { year }.label();
    let report = plain_ytd_report(rows, year);
    let mut by_service: BTreeMap<&str, MetricsBundle> = BTreeMap::new();
    for r in &report {
        by_service
            .entry(r.service_type.as_str())
            .or_default()
            .add(&r.metrics);
    }
    by_service
        .into_iter()
        .map(|(service_type, totals)| BusinessUnitLanding {
            service_type: service_type.to_string(),
            period: label.clone(),
            metrics: SlideMetrics::from_totals(&totals),
        })
        .collect()
}

/// Slide 3: each service type's MTD, QTD and plain YTD totals.
///
/// Service types come from the data. A cell with no rows is left out.
pub fn business_unit_breakdown(
    rows: &[Row],
    ctx: &SlideContext,
) -> Result<Vec<BusinessUnitPeriod>> {
    let month = ctx.month_period()?;
    let quarter = ctx.quarter_period()?;
    let windows = [
        (month, report_for(rows, &month)),
        (quarter, report_for(rows, &quarter)),
        (Period::Year { year: ctx.year }, plain_ytd_report(rows, ctx.year)),
    ];

    let services: BTreeSet<&str> = windows
        .iter()
        .flat_map(|(_, report)| report.iter().map(|r| r.service_type.as_str()))
        .collect();

    let mut out = Vec::new();
    for service_type in services {
        for (period, report) in &windows {
            let cell: Vec<&ReportRecord> = report
                .iter()
                .filter(|r| r.service_type == service_type)
                .collect();
            if cell.is_empty() {
                continue;
            }
            out.push(BusinessUnitPeriod {
                service_type: service_type.to_string(),
                period_type: period.period_type().to_date_code().to_string(),
                block: PeriodBlock {
                    period: period.label(),
                    metrics: SlideMetrics::from_totals(&sum_records(cell)),
                },
            });
        }
    }
    Ok(out)
}

/// Slide 4: per customer QTD and smart YTD, summed across service types.
pub fn customer_achievement(
    rows: &[Row],
    ctx: &SlideContext,
) -> Result<Vec<CustomerAchievement>> {
    let quarter = ctx.quarter_period()?;
    let year = Period::Year { year: ctx.year };
    let qtd = report_for(rows, &quarter);
    let ytd = report_for(rows, &year);

    let customers: BTreeSet<&str> = qtd
        .iter()
        .chain(ytd.iter())
        .map(|r| r.customer.as_str())
        .collect();

    let block = |report: &[ReportRecord], customer: &str, period: &Period| {
        let records: Vec<&ReportRecord> =
            report.iter().filter(|r| r.customer == customer).collect();
        if records.is_empty() {
            None
        } else {
            Some(PeriodBlock {
                period: period.label(),
                metrics: SlideMetrics::from_totals(&sum_records(records)),
            })
        }
    };

    Ok(customers
        .into_iter()
        .map(|customer| CustomerAchievement {
            customer: customer.to_string(),
            qtd: block(qtd.as_slice(), customer, &quarter),
            ytd: block(ytd.as_slice(), customer, &year),
        })
        .collect())
}

/// Slide 5: per (customer, service type) QTD and smart YTD.
///
/// Each report record already covers exactly one pair, so its percentages
/// are used directly.
pub fn customer_by_service_type(
    rows: &[Row],
    ctx: &SlideContext,
) -> Result<Vec<CustomerServiceAchievement>> {
    let quarter = ctx.quarter_period()?;
    let qtd = report_for(rows, &quarter);
    let ytd = report_for(rows, &Period::Year { year: ctx.year });

    let mut pairs: BTreeMap<(&str, &str), (Option<&ReportRecord>, Option<&ReportRecord>)> =
        BTreeMap::new();
    for r in &qtd {
        pairs
            .entry((r.customer.as_str(), r.service_type.as_str()))
            .or_default()
            .0 = Some(r);
    }
    for r in &ytd {
        pairs
            .entry((r.customer.as_str(), r.service_type.as_str()))
            .or_default()
            .1 = Some(r);
    }

    let block = |r: &ReportRecord| PeriodBlock {
        period: r.label.clone(),
        metrics: SlideMetrics::from_record(r),
    };

    Ok(pairs
        .into_iter()
        .map(|((customer, service_type), (q, y))| CustomerServiceAchievement {
            customer: customer.to_string(),
            service_type: service_type.to_string(),
            qtd: q.map(block),
            ytd: y.map(block),
        })
        .collect())
}

/// All five slides for one reporting context.
#[derive(Debug, Clone, Serialize)]
pub struct SlideDeck {
    pub landing_achievement: LandingAchievement,
    pub business_unit_landing: Vec<BusinessUnitLanding>,
    pub business_unit_breakdown: Vec<BusinessUnitPeriod>,
    pub customer_achievement: Vec<CustomerAchievement>,
    pub customer_by_service_type: Vec<CustomerServiceAchievement>,
}

impl SlideDeck {
    pub fn build(rows: &[Row], ctx: &SlideContext) -> Result<Self> {
        Ok(Self {
            landing_achievement: landing_achievement(rows, ctx.year),
            business_unit_landing: business_unit_landing(rows, ctx.year),
            business_unit_breakdown: business_unit_breakdown(rows, ctx)?,
            customer_achievement: customer_achievement(rows, ctx)?,
            customer_by_service_type: customer_by_service_type(rows, ctx)?,
        })
    }

    /// Write one JSON file per slide into `dir`.
    pub fn export(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let files = [
            (
                "slide1_landing_achievement.json",
                serde_json::to_value(&self.landing_achievement)?,
            ),
            (
                "slide2_business_unit_landing.json",
                serde_json::to_value(&self.business_unit_landing)?,
            ),
            (
                "slide3_business_unit_breakdown.json",
                serde_json::to_value(&self.business_unit_breakdown)?,
            ),
            (
                "slide4_customer_achievement.json",
                serde_json::to_value(&self.customer_achievement)?,
            ),
            (
                "slide5_customer_by_service.json",
                serde_json::to_value(&self.customer_by_service_type)?,
            ),
        ];
        let mut written = Vec::with_capacity(files.len());
        for (name, value) in files {
            let path = dir.join(name);
            write_json(&path, &value)?;
            info!("Slide exported to {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}
