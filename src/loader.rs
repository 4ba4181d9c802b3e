use crate::error::{EtlError, Result};
use crate::types::{Month, RawRow, Row, MASTER_COLUMNS};
use crate::util::{amount_or_zero, parse_i32_safe};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Sheet read from workbooks when present; otherwise the first sheet.
pub const MASTER_SHEET: &str = "Master Data";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    pub duplicate_keys: usize,
}

/// Load the master table from a `.csv` file or a spreadsheet workbook.
///
/// Missing amounts become 0. Rows without a usable customer, service type,
/// year or month are skipped and counted. Duplicate
/// (customer, service type, year, month) keys are kept, so later sums include
/// both, but each one is logged.
pub fn load_table(path: &Path) -> Result<(Vec<Row>, LoadReport)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let raw = match ext.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        _ => return Err(EtlError::UnsupportedInput(path.to_path_buf())),
    };

    let (rows, report) = clean_rows(raw);
    info!(
        "Loaded {} records from {} ({} skipped, {} duplicate keys)",
        report.loaded_rows,
        path.display(),
        report.skipped_rows,
        report.duplicate_keys
    );
    Ok((rows, report))
}

fn check_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let present: HashSet<&str> = headers.into_iter().map(str::trim).collect();
    for col in MASTER_COLUMNS {
        if !present.contains(col) {
            return Err(EtlError::MissingColumn(col.to_string()));
        }
    }
    Ok(())
}

/// Rows tagged with their 1-based line in the source; `Err` entries are rows
/// the reader itself could not decode.
type RawRows = Vec<(usize, std::result::Result<RawRow, String>)>;

fn read_csv(path: &Path) -> Result<RawRows> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;
    check_columns(rdr.headers()?.iter())?;
    // Line 1 is the header.
    Ok(rdr
        .deserialize::<RawRow>()
        .enumerate()
        .map(|(idx, r)| (idx + 2, r.map_err(|e| e.to_string())))
        .collect())
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        _ => None,
    }
}

fn read_workbook(path: &Path) -> Result<RawRows> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet = sheet_names
        .iter()
        .find(|n| n.as_str() == MASTER_SHEET)
        .or_else(|| sheet_names.first())
        .cloned()
        .ok_or_else(|| EtlError::EmptyWorkbook(path.to_path_buf()))?;
    let range = workbook.worksheet_range(&sheet)?;
    let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|h| h.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();
    check_columns(headers.iter().map(String::as_str))?;

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();
    let get = |cells: &[Data], col: &str| -> Option<String> {
        index
            .get(col)
            .and_then(|&i| cells.get(i))
            .and_then(cell_text)
    };

    Ok(rows
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|(idx, cells)| {
            let row = RawRow {
                customer: get(cells, "Customer"),
                service_type: get(cells, "Service_Type"),
                year: get(cells, "Year"),
                month: get(cells, "Month"),
                cost: get(cells, "Cost"),
                target: get(cells, "Target"),
                revenue: get(cells, "Revenue"),
                receivables_collected: get(cells, "Receivables Collected"),
            };
            (first_line + idx + 1, Ok(row))
        })
        .collect())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_row(raw: RawRow) -> std::result::Result<Row, String> {
    let customer = non_empty(raw.customer).ok_or("missing Customer")?;
    let service_type = non_empty(raw.service_type).ok_or("missing Service_Type")?;
    let year = parse_i32_safe(raw.year.as_deref()).ok_or("missing or invalid Year")?;
    let month: Month = raw
        .month
        .as_deref()
        .ok_or_else(|| "missing Month".to_string())?
        .parse()?;
    Ok(Row {
        customer,
        service_type,
        year,
        month,
        cost: amount_or_zero(raw.cost.as_deref()),
        target: amount_or_zero(raw.target.as_deref()),
        revenue: amount_or_zero(raw.revenue.as_deref()),
        receivables_collected: amount_or_zero(raw.receivables_collected.as_deref()),
    })
}

fn clean_rows(raw: RawRows) -> (Vec<Row>, LoadReport) {
    let mut report = LoadReport {
        total_rows: raw.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(raw.len());
    let mut seen: HashSet<(String, String, i32, Month)> = HashSet::new();

    for (line, result) in raw {
        let row = match result.and_then(clean_row) {
            Ok(r) => r,
            Err(reason) => {
                warn!("Skipping row {}: {}", line, reason);
                report.skipped_rows += 1;
                continue;
            }
        };
        let key = (
            row.customer.clone(),
            row.service_type.clone(),
            row.year,
            row.month,
        );
        if !seen.insert(key) {
            warn!(
                "Duplicate row {} for {}/{} {} {}; amounts will be summed",
                line, row.customer, row.service_type, row.month, row.year
            );
            report.duplicate_keys += 1;
        }
        rows.push(row);
    }
    report.loaded_rows = rows.len();
    (rows, report)
}
