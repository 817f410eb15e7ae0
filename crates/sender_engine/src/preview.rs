use crate::SheetData;

pub const PREVIEW_ROWS: usize = 5;
pub const MAX_PREVIEW_CELL: usize = 50;
const BLANK_CELL: &str = "-";

/// First rows of a sheet for the upload response, aligned with `sheet.columns()`.
pub fn preview_rows(sheet: &SheetData) -> Vec<Vec<String>> {
    let width = sheet.columns().len();
    sheet
        .rows()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| row.iter().take(width).map(|cell| preview_cell(cell)).collect())
        .collect()
}

fn preview_cell(cell: &str) -> String {
    if cell.trim().is_empty() {
        BLANK_CELL.to_string()
    } else {
        cell.chars().take(MAX_PREVIEW_CELL).collect()
    }
}
