use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use rust_xlsxwriter::{Format, Workbook};
use tracing::{error, info, instrument};

use crate::{
    analysis::{format::DisplayTable, service::AnalysisService},
    data::{cache::Clock, source::PriceSource},
    error::PriceActionError,
};

/// Writes the formatted table as CSV: an unnamed index column holding the
/// row labels, then every display column in order. Values keep their two
/// decimals; undefined cells are blank.
pub fn write_csv<W: Write>(table: &DisplayTable, writer: W) -> Result<(), PriceActionError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push(String::new());
    header.extend(table.columns.iter().cloned());
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.label.clone());
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| format!("{:.2}", v)).unwrap_or_default()),
        );
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn csv_bytes(table: &DisplayTable) -> Result<Vec<u8>, PriceActionError> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    Ok(buffer)
}

pub fn export_csv<P: AsRef<Path>>(table: &DisplayTable, path: P) -> Result<(), PriceActionError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_csv(table, file)?;
    info!("Analysis for {} saved to {}", table.ticker, path.display());
    Ok(())
}

/// Name of the only sheet in an exported workbook.
pub const ANALYSIS_SHEET: &str = "Analysis";

/// Builds a single-sheet workbook laid out like the CSV export: row labels
/// in the first column, display columns after it, numbers shown with two
/// decimals and undefined cells left empty.
pub fn analysis_workbook(table: &DisplayTable) -> Result<Workbook, PriceActionError> {
    let mut workbook = Workbook::new();
    let two_decimals = Format::new().set_num_format("0.00");
    let sheet = workbook.add_worksheet();
    sheet.set_name(ANALYSIS_SHEET)?;

    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string(0, (col + 1) as u16, name.as_str())?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        sheet.write_string(sheet_row, 0, row.label.as_str())?;
        for (col, value) in row.values.iter().enumerate() {
            if let Some(value) = value {
                sheet.write_number_with_format(
                    sheet_row,
                    (col + 1) as u16,
                    *value,
                    &two_decimals,
                )?;
            }
        }
    }
    Ok(workbook)
}

pub fn xlsx_bytes(table: &DisplayTable) -> Result<Vec<u8>, PriceActionError> {
    let mut workbook = analysis_workbook(table)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn export_xlsx<P: AsRef<Path>>(table: &DisplayTable, path: P) -> Result<(), PriceActionError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    analysis_workbook(table)?.save(path)?;
    info!("Workbook for {} saved to {}", table.ticker, path.display());
    Ok(())
}

/// File name used for a ticker's exported analysis.
pub fn analysis_file_name(ticker: &str) -> String {
    format!("{}_analysis.csv", ticker)
}

pub fn workbook_file_name(ticker: &str) -> String {
    format!("{}_analysis.xlsx", ticker)
}

/// Exports `<dir>/<ticker>_analysis.csv` for every ticker. A failing ticker
/// is logged and skipped; the paths written are returned.
#[instrument(skip(service, tickers, dir))]
pub fn export_tickers<S, C>(
    service: &mut AnalysisService<S, C>,
    tickers: &[String],
    dir: &Path,
) -> Result<Vec<PathBuf>, PriceActionError>
where
    S: PriceSource,
    C: Clock,
{
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        match service.formatted_table(ticker) {
            Ok(table) => {
                let path = dir.join(analysis_file_name(ticker));
                export_csv(&table, &path)?;
                written.push(path);
            }
            Err(e) => {
                error!("Failed to analyse {}: {}. Skipping.", ticker, e);
            }
        }
    }
    info!("Exported {} of {} tickers", written.len(), tickers.len());
    Ok(written)
}
