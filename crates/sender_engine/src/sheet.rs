use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use sender_core::Job;
use thiserror::Error;

pub const NUMBER_COLUMN: &str = "Number";
pub const MESSAGE_COLUMN: &str = "Message";
pub const IMAGE_COLUMN: &str = "Image";
pub const REQUIRED_COLUMNS: [&str; 2] = [NUMBER_COLUMN, MESSAGE_COLUMN];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("unsupported spreadsheet type: {0}")]
    UnsupportedType(String),
    #[error("could not read spreadsheet: {0}")]
    Read(String),
    #[error("spreadsheet has no worksheet")]
    NoWorksheet,
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Header plus text cells of the first worksheet. Rows are padded to the header width.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetData {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SheetData {
    /// Builds sheet data from raw rows; the first row is the header.
    pub fn from_raw_rows(raw: Vec<Vec<String>>) -> Self {
        let mut raw = raw.into_iter();
        let columns: Vec<String> = raw
            .next()
            .unwrap_or_default()
            .iter()
            .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let width = columns.len();
        let rows = raw
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|mut row| {
                row.resize(width.max(row.len()), String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// Converts rows into jobs, failing when a required column is absent.
    pub fn jobs(&self) -> Result<Vec<Job>, SheetError> {
        let (Some(number), Some(message)) = (
            self.column_index(NUMBER_COLUMN),
            self.column_index(MESSAGE_COLUMN),
        ) else {
            return Err(SheetError::MissingColumns(self.missing_required()));
        };
        let image = self.column_index(IMAGE_COLUMN);

        Ok(self
            .rows
            .iter()
            .map(|row| {
                Job::new(
                    row[number].clone(),
                    row[message].clone(),
                    image.map(|idx| row[idx].clone()),
                )
            })
            .collect())
    }
}

/// Reads the first worksheet of an Excel/ODS workbook or a CSV file.
pub fn load_sheet(path: &Path) -> Result<SheetData, SheetError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let raw = match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path)?,
        "csv" => read_csv(path)?,
        _ => return Err(SheetError::UnsupportedType(path.display().to_string())),
    };
    Ok(SheetData::from_raw_rows(raw))
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
    let mut workbook = open_workbook_auto(path).map_err(|err| SheetError::Read(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|err| SheetError::Read(err.to_string()))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| SheetError::Read(err.to_string()))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| SheetError::Read(err.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Numbers stored as numeric cells come back as floats; print integral ones without `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            (*value as i64).to_string()
        }
        other => other.to_string(),
    }
}
