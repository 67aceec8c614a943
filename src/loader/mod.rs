//! Daily quote CSV → `QuoteTable`, from a downloaded body or a file on disk.
//! Layout: Date, Open, High, Low, Close, Volume, Adj Close

use crate::error::Result;
use crate::models::{OhlcvRecord, QuoteTable};
use crate::scraper::cleaner::{parse_date, parse_price};
use std::path::Path;
use tracing::{debug, info, warn};

fn field(row: &[String], i: usize) -> f64 {
    row.get(i).map(|s| parse_price(s)).unwrap_or(f64::NAN)
}

fn to_record(row: &[String]) -> Option<OhlcvRecord> {
    let date = parse_date(row.first()?)?;
    Some(OhlcvRecord {
        date,
        open: field(row, 1),
        high: field(row, 2),
        low: field(row, 3),
        close: field(row, 4),
        volume: field(row, 5),
        adj_close: field(row, 6),
    })
}

/// First row is the header; rows without a readable date are skipped.
pub fn rows_to_quote_table(rows: Vec<Vec<String>>) -> QuoteTable {
    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_else(QuoteTable::default_header);

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        match to_record(&row) {
            Some(r) => records.push(r),
            None => warn!("Row {}: unreadable date {:?}", i + 1, row.first()),
        }
    }

    QuoteTable { header, records }
}

/// Read a daily quote CSV from disk.
pub fn load_quote_csv(path: &Path) -> Result<QuoteTable> {
    debug!("Loading quotes from {:?}", path);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let header: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    let mut rows = vec![header];

    for (i, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    let table = rows_to_quote_table(rows);
    info!("{:?}: {} daily rows loaded", path, table.records.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn converts_rows_and_keeps_header() {
        let table = rows_to_quote_table(vec![
            QuoteTable::default_header(),
            row(&["2014-12-19", "10", "12", "9", "11", "100", "11"]),
            row(&["2014-12-18", "10", "null", "9", "11", "100", "11"]),
            row(&["not a date", "1", "1", "1", "1", "1", "1"]),
        ]);
        assert_eq!(table.header, QuoteTable::default_header());
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].date, NaiveDate::from_ymd_opt(2014, 12, 19).unwrap());
        assert_eq!(table.records[0].volume, 100.0);
        assert!(table.records[1].high.is_nan());
    }

    #[test]
    fn short_rows_fill_with_nan() {
        let table = rows_to_quote_table(vec![
            QuoteTable::default_header(),
            row(&["2014-12-19", "10", "12"]),
        ]);
        assert!(table.records[0].adj_close.is_nan());
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("quotes-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "Date,Open,High,Low,Close,Volume,Adj Close\n2014-12-19,10,12,9,11,100,11\n",
        )
        .unwrap();
        let table = load_quote_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(table.header[6], "Adj Close");
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].close, 11.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_quote_csv(Path::new("/definitely/not/here.csv")).is_err());
    }
}
