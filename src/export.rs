// Spreadsheet export of record tables with a Total row

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDateTime};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, XlsxError};
use thiserror::Error;
use tracing::info;

use crate::records::{CellValue, Column, RecordKind, columns_of};

pub const TOTAL_LABEL: &str = "Total";
const AMOUNT_FORMAT: &str = "#,##0.00";
const DATE_FORMAT: &str = "yyyy-mm-dd";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not write export: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Excel error: {0}")]
    Xlsx(#[from] XlsxError),
}

/// `{resource}_{YYYYMMDD_HHMMSS}.{ext}`
pub fn export_file_name(kind: RecordKind, format: ExportFormat, at: NaiveDateTime) -> String {
    format!(
        "{}_{}.{}",
        kind.resource(),
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Sum of every `total` column; `None` for the others.
pub fn totals(columns: &[Column], rows: &[Vec<CellValue>]) -> Vec<Option<f64>> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            column.total.then(|| {
                // fold from +0.0; an empty f64 sum is -0.0
                rows.iter()
                    .filter_map(|row| row.get(i).and_then(CellValue::as_number))
                    .fold(0.0, |acc, v| acc + v)
            })
        })
        .collect()
}

/// The closing row: the label in the first column, sums under `total` columns.
pub fn total_row(columns: &[Column], rows: &[Vec<CellValue>]) -> Vec<CellValue> {
    totals(columns, rows)
        .into_iter()
        .enumerate()
        .map(|(i, total)| match total {
            Some(sum) => CellValue::Amount(sum),
            None if i == 0 => CellValue::text(TOTAL_LABEL),
            None => CellValue::Empty,
        })
        .collect()
}

/// Write `rows` of `kind` into a new file under `dir` and return its path.
pub fn write_export(
    kind: RecordKind,
    rows: &[Vec<CellValue>],
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(kind, format, Local::now().naive_local()));
    let columns = columns_of(kind);

    match format {
        ExportFormat::Xlsx => write_xlsx(&path, kind.title(), columns, rows)?,
        ExportFormat::Csv => write_csv(&path, columns, rows)?,
    }

    info!(%kind, rows = rows.len(), path = %path.display(), "export written");
    Ok(path)
}

fn csv_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Amount(v) => format!("{v:.2}"),
        other => other.to_string(),
    }
}

fn write_csv(path: &Path, columns: &[Column], rows: &[Vec<CellValue>]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns.iter().map(|c| c.title))?;

    for row in rows {
        writer.write_record(row.iter().map(csv_cell))?;
    }

    writer.write_record(total_row(columns, rows).iter().map(csv_cell))?;

    writer.flush()?;
    Ok(())
}

fn write_xlsx(
    path: &Path,
    title: &str,
    columns: &[Column],
    rows: &[Vec<CellValue>],
) -> Result<(), ExportError> {
    let mut workbook = build_workbook(title, columns, rows)?;
    workbook.save(path)?;
    Ok(())
}

fn build_workbook(
    title: &str,
    columns: &[Column],
    rows: &[Vec<CellValue>],
) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(title)?;

    let header = Format::new().set_bold();
    let amount = Format::new().set_num_format(AMOUNT_FORMAT);
    let total_amount = Format::new().set_bold().set_num_format(AMOUNT_FORMAT);
    let date = Format::new().set_num_format(DATE_FORMAT);

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column.title, &header)?;
        worksheet.set_column_width(col, f64::from(column.width.max(6)) + 4.0)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (r, row) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Text(s) => {
                    worksheet.write_string(r, col, s)?;
                }
                CellValue::Amount(v) => {
                    worksheet.write_number_with_format(r, col, *v, &amount)?;
                }
                CellValue::Integer(v) => {
                    worksheet.write_number(r, col, *v as f64)?;
                }
                CellValue::Date(d) => {
                    let excel = ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
                    worksheet.write_datetime_with_format(r, col, &excel, &date)?;
                }
                CellValue::Empty => {}
            }
        }
    }

    let last = rows.len() as u32 + 1;
    for (col, cell) in total_row(columns, rows).into_iter().enumerate() {
        let col = col as u16;
        match cell {
            CellValue::Amount(sum) => {
                worksheet.write_number_with_format(last, col, sum, &total_amount)?;
            }
            CellValue::Text(label) => {
                worksheet.write_string_with_format(last, col, &label, &header)?;
            }
            _ => {}
        }
    }

    Ok(workbook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "expense_manager_{name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn adib_rows() -> Vec<Vec<CellValue>> {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        vec![
            vec![
                CellValue::Date(date),
                CellValue::text("FT1"),
                CellValue::text("Rent, February"),
                CellValue::Amount(1200.5),
                CellValue::Amount(0.0),
                CellValue::Empty,
                CellValue::Integer(1),
            ],
            vec![
                CellValue::Date(date),
                CellValue::text("FT2"),
                CellValue::text("Refund"),
                CellValue::Amount(0.0),
                CellValue::Amount(300.0),
                CellValue::Amount(-900.5),
                CellValue::Integer(0),
            ],
        ]
    }

    #[test]
    fn file_name_has_resource_and_timestamp() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap();
        assert_eq!(
            export_file_name(RecordKind::FuelBill, ExportFormat::Csv, at),
            "fuel-bills_20240305_140709.csv"
        );
    }

    #[test]
    fn totals_only_cover_summed_columns() {
        let sums = totals(columns_of(RecordKind::AdibReport), &adib_rows());
        assert_eq!(sums[0], None);
        assert_eq!(sums[3], Some(1200.5));
        assert_eq!(sums[4], Some(300.0));
        // running balance is not additive
        assert_eq!(sums[5], None);
    }

    #[test]
    fn csv_export_has_header_rows_and_total() {
        let dir = temp_dir("csv");
        let path = write_export(RecordKind::AdibReport, &adib_rows(), ExportFormat::Csv, &dir).unwrap();
        assert!(path.starts_with(&dir));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Date");
        assert_eq!(&headers[3], "Debit");

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][2], "Rent, February");
        assert_eq!(&records[0][3], "1200.50");
        assert_eq!(&records[2][0], TOTAL_LABEL);
        assert_eq!(&records[2][3], "1200.50");
        assert_eq!(&records[2][4], "300.00");
        assert_eq!(&records[2][5], "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_csv_export_still_has_total() {
        let dir = temp_dir("empty_csv");
        let path = write_export(RecordKind::MessBill, &[], ExportFormat::Csv, &dir).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], TOTAL_LABEL);
        assert_eq!(&records[0][2], "0.00");
        assert!(records[0].iter().all(|cell| cell != "-0.00"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_totals_are_positive_zero() {
        let row = total_row(columns_of(RecordKind::MessBill), &[]);
        assert_eq!(row[0], CellValue::text(TOTAL_LABEL));
        match row[2] {
            CellValue::Amount(sum) => {
                assert_eq!(sum, 0.0);
                assert!(sum.is_sign_positive());
            }
            ref other => panic!("expected an amount, got {other:?}"),
        }
    }

    #[test]
    fn xlsx_sheet_is_named_after_the_kind_and_ends_with_totals() {
        let columns = columns_of(RecordKind::AdibReport);
        let rows = adib_rows();
        let mut workbook = build_workbook(RecordKind::AdibReport.title(), columns, &rows).unwrap();
        assert_eq!(workbook.worksheet_from_index(0).unwrap().name(), "ADIB Reports");

        let last = total_row(columns, &rows);
        assert_eq!(last.len(), columns.len());
        assert_eq!(last[0], CellValue::text(TOTAL_LABEL));
        assert_eq!(last[3], CellValue::Amount(1200.5));
        assert_eq!(last[4], CellValue::Amount(300.0));
        assert_eq!(last[5], CellValue::Empty);
    }

    #[test]
    fn xlsx_export_writes_a_workbook() {
        let dir = temp_dir("xlsx");
        let path = write_export(RecordKind::AdibReport, &adib_rows(), ExportFormat::Xlsx, &dir).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));

        // xlsx files are zip archives
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        fs::remove_dir_all(&dir).unwrap();
    }
}
