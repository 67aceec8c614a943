//! Daily OHLCV → monthly / quarterly bars.
//!
//! The walk runs newest-first, the order the history endpoint serves rows in.
//! A window closes when a record dated before the current window's start shows
//! up; the closing bar takes its date and open from the record just before that
//! one (the oldest day of the window). After the walk, the final bar is anchored
//! on the oldest record overall, so a series that does not start on a calendar
//! boundary yields a partial leading window dated at its first trading day.

use crate::models::{Interval, OhlcvRecord, QuoteTable};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

/// Calendar window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// First day of the month `months` after (year, month).
fn shift_months(year: i32, month: u32, months: u32) -> NaiveDate {
    let zero_based = (month - 1) + months;
    first_of_month(year + (zero_based / 12) as i32, zero_based % 12 + 1)
}

/// Calendar month or calendar quarter containing `date`. `None` for intervals that
/// are not built locally.
pub fn window_for(date: NaiveDate, interval: Interval) -> Option<Period> {
    let (first_month, span) = match interval {
        Interval::Month => (date.month(), 1),
        Interval::Quarter => ((date.month() - 1) / 3 * 3 + 1, 3),
        Interval::Day | Interval::Week => return None,
    };
    let start = first_of_month(date.year(), first_month);
    let next = shift_months(date.year(), first_month, span);
    let end = next.pred_opt().unwrap_or(next);
    Some(Period { start, end })
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

/// Running aggregate of one window.
#[derive(Debug)]
struct Accumulator {
    high: f64,
    low: f64,
    close: Option<f64>,
    adj_close: Option<f64>,
    volumes: Vec<f64>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            close: None,
            adj_close: None,
            volumes: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    fn fold(&mut self, rec: &OhlcvRecord) {
        self.high = nan_max(self.high, rec.high);
        self.low = nan_min(self.low, rec.low);
        // newest-first: the first values met belong to the window's last day
        self.close.get_or_insert(rec.close);
        self.adj_close.get_or_insert(rec.adj_close);
        self.volumes.push(rec.volume);
    }

    fn mean_volume(&self) -> f64 {
        let sum: f64 = self.volumes.iter().sum();
        (sum / self.volumes.len() as f64).round()
    }

    fn flush(&self, anchor: &OhlcvRecord) -> OhlcvRecord {
        OhlcvRecord {
            date: anchor.date,
            open: anchor.open,
            high: self.high,
            low: self.low,
            close: self.close.unwrap_or(f64::NAN),
            volume: self.mean_volume(),
            adj_close: self.adj_close.unwrap_or(f64::NAN),
        }
    }
}

/// Resample a daily series. `reference_end` fixes the first (most recent) window;
/// later windows are re-anchored on the record that crossed the boundary.
///
/// `Day` and `Week` return the input unchanged. Output keeps the input's order.
pub fn resample(table: &QuoteTable, interval: Interval, reference_end: NaiveDate) -> QuoteTable {
    let Some(mut window) = window_for(reference_end, interval) else {
        return table.clone();
    };
    if table.records.is_empty() {
        return table.clone();
    }

    let ascending = table.records.len() > 1
        && table.records.first().map(|r| r.date) < table.records.last().map(|r| r.date);
    let newest_first: Vec<&OhlcvRecord> = if ascending {
        table.records.iter().rev().collect()
    } else {
        table.records.iter().collect()
    };

    let mut bars = Vec::new();
    let mut acc = Accumulator::new();

    for (i, rec) in newest_first.iter().enumerate() {
        if rec.date < window.start {
            if !acc.is_empty() {
                bars.push(acc.flush(newest_first[i - 1]));
            }
            acc = Accumulator::new();
            if let Some(w) = window_for(rec.date, interval) {
                window = w;
            }
        }
        acc.fold(rec);
    }
    if let Some(oldest) = newest_first.last() {
        bars.push(acc.flush(oldest));
    }

    if ascending {
        bars.reverse();
    }

    debug!(
        "resampled {} daily rows into {} {:?} bars",
        table.records.len(),
        bars.len(),
        interval
    );

    QuoteTable {
        header: table.header.clone(),
        records: bars,
    }
}
