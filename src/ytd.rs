//! Smart year-to-date windows.
//!
//! A customer's YTD stops at the last month that booked revenue, so months
//! that have only a target (no actuals yet) do not drag achievement down.

use crate::types::{Month, Row};

fn is_pair(r: &Row, customer: &str, service_type: &str, year: i32) -> bool {
    r.year == year && r.customer == customer && r.service_type == service_type
}

/// Latest calendar month with revenue above zero for the pair, if any.
pub fn last_revenue_month(
    rows: &[Row],
    customer: &str,
    service_type: &str,
    year: i32,
) -> Option<Month> {
    rows.iter()
        .filter(|r| is_pair(r, customer, service_type, year) && r.revenue > 0.0)
        .map(|r| r.month)
        .max()
}

/// Jan..=last revenue month, or all twelve months when nothing has revenue.
pub fn resolve(rows: &[Row], customer: &str, service_type: &str, year: i32) -> Vec<Month> {
    match last_revenue_month(rows, customer, service_type, year) {
        Some(last) => last.up_to(),
        None => Month::ALL.to_vec(),
    }
}

/// The pair's rows inside its smart YTD window, in source order.
pub fn filter_smart_ytd<'a>(
    rows: &'a [Row],
    customer: &str,
    service_type: &str,
    year: i32,
) -> Vec<&'a Row> {
    let months = resolve(rows, customer, service_type, year);
    rows.iter()
        .filter(|r| is_pair(r, customer, service_type, year) && months.contains(&r.month))
        .collect()
}
