// Entry point and high-level CLI flow.
//
// Default mode loads the master table once and then either prints a single
// period report (--period) or runs the whole MTD/QTD/YTD batch. --slides adds
// the five dashboard slides and --export writes everything as JSON files.
// The `populate` subcommand builds the master table from monthly JSON sheets.
use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use proceed_report::config::{RunConfig, DEFAULT_INPUT};
use proceed_report::output::{export_report, preview_report, write_csv, write_json};
use proceed_report::period::Period;
use proceed_report::types::Row;
use proceed_report::util::format_int;
use proceed_report::{
    generate_all_reports, load_table, master, report_for, PeriodType, SlideDeck,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "proceed-report")]
#[command(version, about = "Proceed revenue ETL: MTD/QTD/YTD reports and dashboard slides")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    report: ReportArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ReportArgs {
    /// Master table (.csv or Excel workbook)
    #[arg(long, env = "PROCEED_INPUT", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Directory for exported JSON files
    #[arg(long, env = "PROCEED_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Reporting year (default: current year)
    #[arg(long)]
    year: Option<i32>,

    /// Current month, 1-12 (default: current month)
    #[arg(long)]
    month: Option<u32>,

    /// Current quarter, 1-4 (default: current quarter)
    #[arg(long)]
    quarter: Option<u32>,

    /// Generate only this period's report
    #[arg(long, value_enum)]
    period: Option<PeriodType>,

    /// Export reports to JSON files
    #[arg(long)]
    export: bool,

    /// Also build the five dashboard slides
    #[arg(long)]
    slides: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the master table from monthly JSON sheets
    Populate {
        /// JSON sheets, one metric per file
        #[arg(required = true, value_name = "SOURCE")]
        sources: Vec<PathBuf>,

        /// Year stamped on every master row (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Master table CSV to write
        #[arg(short, long, default_value = "Master_Table.csv")]
        output: PathBuf,

        /// Also write a per customer/service summary CSV
        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

/// Load the master table, printing a short summary of what happened.
fn handle_load(cfg: &RunConfig) -> Result<Vec<Row>> {
    let (rows, load_report) = load_table(&cfg.input)
        .with_context(|| format!("Error loading {}", cfg.input.display()))?;
    println!(
        "Processing dataset... ({} rows read, {} loaded)",
        format_int(load_report.total_rows as u64),
        format_int(load_report.loaded_rows as u64)
    );
    if load_report.skipped_rows > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            format_int(load_report.skipped_rows as u64)
        );
    }
    if load_report.duplicate_keys > 0 {
        println!(
            "Note: {} duplicate customer/service/month rows were summed.",
            format_int(load_report.duplicate_keys as u64)
        );
    }
    println!();
    Ok(rows)
}

fn handle_single_report(
    rows: &[Row],
    cfg: &RunConfig,
    period_type: PeriodType,
    export: bool,
) -> Result<()> {
    let period = Period::new(period_type, cfg.year, Some(cfg.month), Some(cfg.quarter))?;
    let report = report_for(rows, &period);

    println!(
        "\n=== {} {} Report ===",
        period.label(),
        period_type.to_date_code()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    preview_report(&report, 5);

    if export {
        let name = format!("{}_report_{}", period_type, cfg.year);
        export_report(&cfg.out_dir, &name, &report)?;
    }
    Ok(())
}

fn handle_all_reports(rows: &[Row], cfg: &RunConfig, export: bool) -> Result<()> {
    println!("\nGenerating all reports for {}...", cfg.year);
    let batch = generate_all_reports(rows, cfg.year, cfg.month, cfg.quarter);

    for report in &batch.reports {
        println!("\n=== {} ===", report.name);
        println!("Records: {}", report.records.len());
        if export {
            export_report(&cfg.out_dir, &report.name, &report.records)?;
        }
    }
    for (name, err) in &batch.failures {
        warn!("Skipped {}: {}", name, err);
    }
    if let Some(ytd) = batch.reports.last() {
        println!("\n{} preview:\n", ytd.name);
        preview_report(&ytd.records, 5);
    }
    Ok(())
}

fn handle_slides(rows: &[Row], cfg: &RunConfig, export: bool) -> Result<()> {
    let ctx = cfg.slide_context();
    let deck = SlideDeck::build(rows, &ctx)?;
    println!(
        "\nSlides for {} (MTD month {}, QTD Q{})",
        ctx.year, ctx.month, ctx.quarter
    );
    if export {
        let written = deck.export(&cfg.out_dir)?;
        println!("{} slide files written to {}", written.len(), cfg.out_dir.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&deck)?);
    }
    Ok(())
}

fn handle_populate(
    sources: &[PathBuf],
    year: i32,
    output: &Path,
    summary: Option<&Path>,
) -> Result<()> {
    let (rows, report) = master::populate(sources, year);
    if report.merged_sources == 0 {
        bail!("none of the {} source files could be read", sources.len());
    }
    write_csv(output, &rows).with_context(|| format!("Error saving {}", output.display()))?;
    info!("Master table written to {}", output.display());

    if let Some(path) = summary {
        let summary_rows = master::summarize(&rows);
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            write_json(path, &summary_rows)?;
        } else {
            write_csv(path, &summary_rows)?;
        }
        info!("Summary written to {}", path.display());
    }

    println!("\nMaster table populated successfully!");
    println!("Total records created: {}", format_int(rows.len() as u64));
    println!(
        "Sources merged: {} ({} failed)",
        report.merged_sources,
        report.failed_sources.len()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    if let Some(Commands::Populate {
        sources,
        year,
        output,
        summary,
    }) = cli.command
    {
        let year = year.unwrap_or_else(|| today.year());
        return handle_populate(&sources, year, &output, summary.as_deref());
    }

    let args = cli.report;
    let cfg = RunConfig::resolve(
        args.input,
        args.out_dir,
        args.year,
        args.month,
        args.quarter,
        today,
    );
    if args.export {
        std::fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("Cannot create {}", cfg.out_dir.display()))?;
    }

    let rows = handle_load(&cfg)?;

    match args.period {
        Some(p) => handle_single_report(&rows, &cfg, p, args.export)?,
        None => handle_all_reports(&rows, &cfg, args.export)?,
    }
    if args.slides {
        handle_slides(&rows, &cfg, args.export)?;
    }
    Ok(())
}
