use crate::error::Result;
use crate::reports::ReportRecord;
use crate::types::ReportPreviewRow;
use log::info;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write `records` to `{dir}/{name}.json`.
pub fn export_report(dir: &Path, name: &str, records: &[ReportRecord]) -> Result<()> {
    let path = dir.join(format!("{}.json", name));
    write_json(&path, records)?;
    info!("Report exported to {}", path.display());
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_report(records: &[ReportRecord], max_rows: usize) {
    let rows: Vec<ReportPreviewRow> = records.iter().map(ReportRecord::preview_row).collect();
    preview_table_rows(&rows, max_rows);
}
