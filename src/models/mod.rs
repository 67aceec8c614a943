use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Cells and tables ──────────────────────────────────────────────────────────

/// One value in a scraped table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Two-dimensional table; orientation depends on the producer.
pub type Table = Vec<Vec<Cell>>;

/// One record keyed by header name.
pub type Record = BTreeMap<String, Cell>;

/// Requested output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    /// Header row followed by one row per record.
    #[default]
    RowArray,
    /// One row per field (transposed).
    ColumnArray,
    /// One field→value mapping per record.
    DictArray,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rowArray" | "row" | "rarray" => Ok(OutputFormat::RowArray),
            "columnArray" | "column" | "carray" => Ok(OutputFormat::ColumnArray),
            "dictArray" | "dict" | "aarray" => Ok(OutputFormat::DictArray),
            other => Err(format!("unknown format '{}'", other)),
        }
    }
}

/// A table after shaping: either rows of cells or keyed records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Shaped {
    Rows(Table),
    Records(Vec<Record>),
}

impl Shaped {
    pub fn len(&self) -> usize {
        match self {
            Shaped::Rows(t) => t.len(),
            Shaped::Records(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Quotes ────────────────────────────────────────────────────────────────────

/// Bar size of a quote series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
}

impl Interval {
    /// Bar size the history endpoint is asked for; coarser bars are built locally.
    pub fn source_code(self) -> &'static str {
        match self {
            Interval::Day | Interval::Month | Interval::Quarter => "d",
            Interval::Week => "w",
        }
    }

    pub fn needs_resampling(self) -> bool {
        matches!(self, Interval::Month | Interval::Quarter)
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Interval::Day),
            "w" | "week" | "weekly" => Ok(Interval::Week),
            "m" | "month" | "monthly" => Ok(Interval::Month),
            "q" | "quarter" | "quarterly" => Ok(Interval::Quarter),
            other => Err(format!("unknown interval '{}'", other)),
        }
    }
}

/// One daily (or resampled) bar. Unparsable numbers are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub adj_close: f64,
}

/// Header row plus records, in the order the source delivered them.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTable {
    pub header: Vec<String>,
    pub records: Vec<OhlcvRecord>,
}

impl QuoteTable {
    pub fn default_header() -> Vec<String> {
        ["Date", "Open", "High", "Low", "Close", "Volume", "Adj Close"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Rows for shaping: header first, dates as text, numbers as text or numbers.
    pub fn to_table(&self, to_number: bool) -> Table {
        let mut table = Vec::with_capacity(self.records.len() + 1);
        table.push(self.header.iter().map(Cell::text).collect());
        for r in &self.records {
            let values = [r.open, r.high, r.low, r.close, r.volume, r.adj_close];
            let mut row = vec![Cell::Text(r.date.format("%Y-%m-%d").to_string())];
            row.extend(values.iter().map(|v| {
                if to_number {
                    Cell::Number(*v)
                } else {
                    Cell::Text(v.to_string())
                }
            }));
            table.push(row);
        }
        table
    }
}

// ── Fundamentals ──────────────────────────────────────────────────────────────

/// Financial statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementKind {
    CashFlow,
    IncomeStatement,
    BalanceSheet,
}

impl StatementKind {
    pub fn title(self) -> &'static str {
        match self {
            StatementKind::CashFlow => "Cash Flow",
            StatementKind::IncomeStatement => "Income Statement",
            StatementKind::BalanceSheet => "Balance Sheet",
        }
    }

    /// Path segment: initials of the title ("Cash Flow" → "cf").
    pub fn path(self) -> String {
        initials(self.title())
    }
}

/// Lowercased first letter of each word.
pub fn initials(title: &str) -> String {
    title
        .split(' ')
        .filter_map(|w| w.chars().next())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportTerm {
    #[default]
    Annual,
    Quarter,
}

impl ReportTerm {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportTerm::Annual => "annual",
            ReportTerm::Quarter => "quarter",
        }
    }
}

// ── Directory shards ──────────────────────────────────────────────────────────

/// One alphabetic slice of the company directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardJob {
    pub index: usize,
    pub letter: char,
}

impl ShardJob {
    pub const COUNT: usize = 26;

    /// `A`..`Z`, index 0..25.
    pub fn all() -> Vec<ShardJob> {
        ('A'..='Z')
            .enumerate()
            .map(|(index, letter)| ShardJob { index, letter })
            .collect()
    }
}
