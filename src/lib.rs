//! Revenue ETL for the performance dashboard.
//!
//! Loads the master table (customer, service type, year, month, cost, target,
//! revenue, receivables collected), builds month / quarter / smart year-to-date
//! reports per customer and service type, and regroups them into the five
//! dashboard slides.

pub mod config;
pub mod error;
pub mod loader;
pub mod master;
pub mod metrics;
pub mod output;
pub mod period;
pub mod reports;
pub mod slides;
pub mod types;
pub mod util;
pub mod ytd;

pub use error::{EtlError, Result};
pub use loader::{load_table, LoadReport};
pub use metrics::{aggregate, derive};
pub use period::{filter, filter_by_period, quarter_months, Period, PeriodType};
pub use reports::{
    generate_all_reports, generate_report, plain_ytd_report, report_for, ReportBatch,
    ReportRecord,
};
pub use slides::{SlideContext, SlideDeck};
pub use types::{DerivedBundle, MetricsBundle, Month, PeriodLabel, Row};
