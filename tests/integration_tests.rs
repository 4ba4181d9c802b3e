use approx::assert_relative_eq;
use proceed_report::master::{populate, summarize};
use proceed_report::output::write_csv;
use proceed_report::ytd;
use proceed_report::*;
use std::path::PathBuf;

fn row(
    customer: &str,
    service: &str,
    month: Month,
    cost: f64,
    target: f64,
    revenue: f64,
) -> Row {
    Row {
        customer: customer.to_string(),
        service_type: service.to_string(),
        year: 2024,
        month,
        cost,
        target,
        revenue,
        receivables_collected: revenue * 0.75,
    }
}

/// Two service types, three customers, revenue tailing off at different months.
fn sample_table() -> Vec<Row> {
    let mut rows = Vec::new();
    for (i, month) in Month::ALL.iter().enumerate() {
        let i = i as f64;
        let has_actuals = month.number() <= 5;
        rows.push(row(
            "Al Futtaim",
            "Transportation",
            *month,
            40.0 + i,
            100.0,
            if has_actuals { 90.0 + i } else { 0.0 },
        ));
        rows.push(row(
            "Al Futtaim",
            "Warehouses",
            *month,
            20.0,
            50.0,
            if month.number() <= 3 { 55.0 } else { 0.0 },
        ));
        rows.push(row(
            "Nestle",
            "Warehouses",
            *month,
            10.0 * i,
            80.0,
            if has_actuals { 70.0 + 3.0 * i } else { 0.0 },
        ));
    }
    let mut other_year = row("Nestle", "Warehouses", Month::Jan, 1.0, 1.0, 999.0);
    other_year.year = 2023;
    rows.push(other_year);
    rows
}

#[test]
fn sample_row_month_report() {
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
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json[0]["Jan 2024 Revenue"], 80.0);
    assert_eq!(json[0]["Jan 2024 Ach. %"], 80.0);
    assert_eq!(json[0]["Jan 2024 Gross Profit %"], 37.5);
    assert_eq!(json[0]["Jan 2024 Receivables Collected Rate %"], 50.0);
}

#[test]
fn monthly_reports_partition_the_plain_year() {
    let rows = sample_table();
    let mut months_total = MetricsBundle::default();
    for m in 1..=12 {
        let subset = filter_by_period(&rows, PeriodType::Month, 2024, Some(m), None).unwrap();
        months_total.add(&aggregate(subset));
    }
    let year = aggregate(filter_by_period(&rows, PeriodType::Year, 2024, None, None).unwrap());
    assert_relative_eq!(months_total.cost, year.cost);
    assert_relative_eq!(months_total.target, year.target);
    assert_relative_eq!(months_total.revenue, year.revenue);
    assert_relative_eq!(
        months_total.receivables_collected,
        year.receivables_collected
    );
}

#[test]
fn quarters_partition_the_plain_year() {
    let rows = sample_table();
    let by_quarters: f64 = (1..=4)
        .map(|q| {
            aggregate(filter_by_period(&rows, PeriodType::Quarter, 2024, None, Some(q)).unwrap())
                .revenue
        })
        .sum();
    let year = aggregate(filter_by_period(&rows, PeriodType::Year, 2024, None, None).unwrap());
    assert_relative_eq!(by_quarters, year.revenue);
}

#[test]
fn revenue_only_in_march_gives_jan_to_mar_window() {
    let mut rows = Vec::new();
    for month in Month::ALL {
        let revenue = if month == Month::Mar { 120.0 } else { 0.0 };
        rows.push(row("Solo", "Warehouses", month, 10.0, 50.0, revenue));
    }
    assert_eq!(
        ytd::resolve(&rows, "Solo", "Warehouses", 2024),
        vec![Month::Jan, Month::Feb, Month::Mar]
    );

    let report = generate_report(&rows, PeriodType::Year, 2024, None, None).unwrap();
    assert_eq!(report.len(), 1);
    let full_year = aggregate(&rows);
    assert_relative_eq!(report[0].metrics.revenue, full_year.revenue);

    let q1 = generate_report(&rows, PeriodType::Quarter, 2024, None, Some(1)).unwrap();
    assert_eq!(report[0].derived.achievement_pct, q1[0].derived.achievement_pct);
    assert_eq!(report[0].derived.achievement_pct, 80.0);
}

#[test]
fn smart_ytd_differs_per_pair() {
    let rows = sample_table();
    let report = generate_report(&rows, PeriodType::Year, 2024, None, None).unwrap();
    let keys: Vec<(&str, &str)> = report
        .iter()
        .map(|r| (r.customer.as_str(), r.service_type.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Al Futtaim", "Transportation"),
            ("Al Futtaim", "Warehouses"),
            ("Nestle", "Warehouses"),
        ]
    );
    // Jan..May for transportation, Jan..Mar for warehouses.
    assert_relative_eq!(report[0].metrics.target, 500.0);
    assert_relative_eq!(report[1].metrics.target, 150.0);
    assert_eq!(report[1].derived.achievement_pct, 110.0);
    // The 2023 row never leaks in.
    assert_relative_eq!(report[2].metrics.target, 400.0);
}

#[test]
fn business_unit_landing_uses_summed_totals() {
    let rows = vec![
        row("A", "Transportation", Month::Jan, 0.0, 100.0, 100.0),
        row("B", "Transportation", Month::Apr, 0.0, 200.0, 300.0),
    ];
    let units = slides::business_unit_landing(&rows, 2024);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].metrics.target, 300.0);
    assert_eq!(units[0].metrics.revenue, 400.0);
    assert_eq!(units[0].metrics.achievement_pct, 133.33);
}

#[test]
fn slide_deck_exports_five_files() {
    let rows = sample_table();
    let ctx = SlideContext {
        year: 2024,
        month: 5,
        quarter: 2,
    };
    let deck = SlideDeck::build(&rows, &ctx).unwrap();
    assert_eq!(deck.business_unit_landing.len(), 2);
    assert_eq!(deck.customer_achievement.len(), 2);
    assert_eq!(deck.customer_by_service_type.len(), 3);

    // Landing is plain YTD: every 2024 target counts.
    assert_relative_eq!(deck.landing_achievement.metrics.target, 12.0 * 230.0);

    let dir = tempfile::tempdir().unwrap();
    let written = deck.export(dir.path()).unwrap();
    assert_eq!(written.len(), 5);
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }
    let landing: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("slide1_landing_achievement.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(landing["Period"], "2024");
    assert!(landing.get("Ach. %").is_some());
}

#[test]
fn populated_master_table_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, body: &str| -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    };
    let sources = vec![
        write(
            "Wh Revenue.json",
            r#"[{"Customer":"Nestle","Service_Type":"Warehouses",
                "Relevant column in master table":"Revenue","Jan":"1,500","Feb":"2,000"}]"#,
        ),
        write(
            "Wh Target.json",
            r#"[{"Customer":"Nestle","Service_Type":"Warehouses",
                "Relevant column in master table":"Target",
                "Jan":"1,000","Feb":"1,000","Mar":"1,000"}]"#,
        ),
        write(
            "Wh cost.json",
            r#"[{"Customer":"Nestle","Service_Type":"Warehouses",
                "Relevant column in master table":"Cost","Jan":"750","Feb":"1,000"}]"#,
        ),
    ];
    let (master_rows, report) = populate(&sources, 2024);
    assert_eq!(report.merged_sources, 3);

    let table = dir.path().join("Master_Table.csv");
    write_csv(&table, &master_rows).unwrap();
    let (rows, load) = load_table(&table).unwrap();
    assert_eq!(load.loaded_rows, 12);
    assert_eq!(load.skipped_rows, 0);
    assert_eq!(rows, master_rows.iter().map(|m| m.to_row()).collect::<Vec<_>>());

    // Smart YTD stops at Feb, so March's target is excluded.
    let ytd = generate_report(&rows, PeriodType::Year, 2024, None, None).unwrap();
    assert_relative_eq!(ytd[0].metrics.target, 2000.0);
    assert_eq!(ytd[0].derived.achievement_pct, 175.0);
    assert_eq!(ytd[0].derived.gross_profit_pct, 50.0);
    assert_eq!(ytd[0].derived.collection_rate_pct, 0.0);

    let summary = summarize(&master_rows);
    assert_eq!(summary[0].total_target, 3000.0);
    assert_eq!(summary[0].achievement, Some(116.67));
}
