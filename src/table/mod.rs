//! CSV tokenization and output shaping (row array / column array / dictionary array).

use crate::error::Result;
use crate::models::{Cell, OutputFormat, Record, Shaped, Table};
use crate::scraper::cleaner::to_number;
use std::collections::BTreeMap;

// ── CSV ───────────────────────────────────────────────────────────────────────

/// Split a CSV body into rows of text cells. The first row is kept as data.
///
/// With `trim_last_delim`, a trailing empty field left by a delimiter at the end
/// of the line is dropped (the directory download ends every line with `,`).
pub fn parse_csv(body: &str, trim_last_delim: bool) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        if trim_last_delim && row.len() > 1 && row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
        }
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Text rows → cells, no coercion.
pub fn to_cells(rows: Vec<Vec<String>>) -> Table {
    rows.into_iter()
        .map(|row| row.into_iter().map(Cell::Text).collect())
        .collect()
}

// ── Coercion ──────────────────────────────────────────────────────────────────

/// Turn numeric-looking text cells into numbers; the rest stays text.
pub fn coerce_numbers(table: &mut Table, skip_header: bool, skip_first_column: bool) {
    let start_row = usize::from(skip_header);
    let start_col = usize::from(skip_first_column);
    for row in table.iter_mut().skip(start_row) {
        for cell in row.iter_mut().skip(start_col) {
            if let Cell::Text(s) = cell {
                if let Some(n) = to_number(s) {
                    *cell = Cell::Number(n);
                }
            }
        }
    }
}

// ── Shapes ────────────────────────────────────────────────────────────────────

/// Rows ↔ columns. Ragged rows are padded with empty text.
pub fn transpose(table: &Table) -> Table {
    let width = table.iter().map(|r| r.len()).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            table
                .iter()
                .map(|row| row.get(col).cloned().unwrap_or_else(|| Cell::text("")))
                .collect()
        })
        .collect()
}

/// First row supplies the keys; every following row becomes one record.
pub fn to_records(table: &Table) -> Vec<Record> {
    let Some((header, body)) = table.split_first() else {
        return Vec::new();
    };
    let keys: Vec<String> = header.iter().map(|c| c.to_string()).collect();
    body.iter()
        .map(|row| {
            keys.iter()
                .enumerate()
                .map(|(i, k)| (k.clone(), row.get(i).cloned().unwrap_or_else(|| Cell::text(""))))
                .collect::<BTreeMap<_, _>>()
        })
        .collect()
}

/// Shape a row-oriented table (header first).
pub fn shape_rows(table: Table, format: OutputFormat) -> Shaped {
    match format {
        OutputFormat::RowArray => Shaped::Rows(table),
        OutputFormat::ColumnArray => Shaped::Rows(transpose(&table)),
        OutputFormat::DictArray => Shaped::Records(to_records(&table)),
    }
}

/// Shape a column-oriented table (one row per field, label first).
pub fn shape_columns(table: Table, format: OutputFormat) -> Shaped {
    match format {
        OutputFormat::ColumnArray => Shaped::Rows(table),
        OutputFormat::RowArray => Shaped::Rows(transpose(&table)),
        OutputFormat::DictArray => Shaped::Records(to_records(&transpose(&table))),
    }
}
