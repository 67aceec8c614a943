pub mod cleaner;
pub mod http_client;
pub mod parsers;
pub mod query;

use crate::config::{AppConfig, QuotesConfig, YahooConfig};
use crate::error::{FetchError, Result};
use crate::loader::rows_to_quote_table;
use crate::models::{
    Cell, Interval, OutputFormat, ReportTerm, Shaped, StatementKind, Table, initials,
};
use crate::resample::resample;
use crate::resolver::SymbolResolver;
use crate::stats;
use crate::table::{coerce_numbers, parse_csv, shape_columns, shape_rows, to_cells};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use self::cleaner::{parse_date, report_value, to_number};
use self::http_client::Transport;
use self::parsers::{parse_key_statistics, parse_report_rows, parse_treasury_yield};
use self::query::Query;

// ── Quote request options ─────────────────────────────────────────────────────

/// Caller-facing quote options; unset fields take configured defaults.
#[derive(Debug, Clone, Default)]
pub struct QuotesOptions {
    pub interval: Option<Interval>,
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Length of the window ending at `end`, used when `begin` is unset.
    pub term_days: Option<i64>,
    pub format: Option<OutputFormat>,
    pub to_number: bool,
}

/// Fully resolved quote request.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotesRequest {
    pub interval: Interval,
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub format: OutputFormat,
    pub to_number: bool,
}

impl QuotesOptions {
    pub fn resolve(&self, today: NaiveDate, defaults: &QuotesConfig) -> Result<QuotesRequest> {
        let term_days = self.term_days.unwrap_or(defaults.term_days);
        if term_days <= 0 {
            return Err(FetchError::InvalidOptions(format!(
                "term must be positive, got {} days",
                term_days
            )));
        }

        let end = self.end.unwrap_or(today);
        let begin = match self.begin {
            Some(b) => b,
            None => Duration::try_days(term_days)
                .and_then(|term| end.checked_sub_signed(term))
                .ok_or_else(|| FetchError::InvalidOptions(format!("term of {} days out of range", term_days)))?,
        };
        if begin > end {
            return Err(FetchError::InvalidOptions(format!(
                "begin {} is after end {}",
                begin, end
            )));
        }

        Ok(QuotesRequest {
            interval: self.interval.unwrap_or(defaults.interval),
            begin,
            end,
            format: self.format.unwrap_or(OutputFormat::RowArray),
            to_number: self.to_number,
        })
    }
}

impl QuotesRequest {
    /// History endpoint query. Months are zero-based on this endpoint.
    pub fn query(&self, symbol: &str) -> Query {
        Query::new()
            .param("g", self.interval.source_code())
            .param("a", self.begin.month0())
            .param("b", self.begin.day())
            .param("c", self.begin.year())
            .param("d", self.end.month0())
            .param("e", self.end.day())
            .param("f", self.end.year())
            .param("s", symbol)
    }
}

/// Treasury table row for a maturity in months.
pub fn treasury_row(maturity_months: u32) -> usize {
    match maturity_months {
        0..=3 => 1,
        4..=6 => 2,
        7..=24 => 3,
        25..=36 => 4,
        37..=60 => 5,
        61..=120 => 6,
        _ => 7,
    }
}

// ── Yahoo scraper ─────────────────────────────────────────────────────────────

/// Quote pages, financial statements, key statistics, price history and
/// treasury yields. Every call issues one request and returns once.
pub struct YahooScraper {
    transport: Arc<dyn Transport>,
    config: YahooConfig,
    quote_defaults: QuotesConfig,
}

impl YahooScraper {
    pub fn new(transport: Arc<dyn Transport>, config: &AppConfig) -> Self {
        Self {
            transport,
            config: config.yahoo.clone(),
            quote_defaults: config.quotes.clone(),
        }
    }

    /// Resolver sharing this scraper's transport.
    pub fn resolver(&self) -> SymbolResolver {
        SymbolResolver::new(Arc::clone(&self.transport), &self.config)
    }

    fn report_url(&self, path: &str, query: Query) -> Result<Url> {
        let base = format!("{}/{}", self.config.report_base_url.trim_end_matches('/'), path);
        query.build(&base)
    }

    async fn fetch_body(&self, url: &Url) -> Result<String> {
        debug!("fetching {}", url);
        let body = self.transport.get(url).await?.into_body()?;
        if body.trim().is_empty() {
            return Err(FetchError::no_content());
        }
        Ok(body)
    }

    /// Cash flow, income statement or balance sheet. Native shape is one row per
    /// line item (`ColumnArray`): `Period Ending` dates first, then values in units.
    pub async fn fundamentals(
        &self,
        kind: StatementKind,
        symbol: &str,
        term: ReportTerm,
        format: Option<OutputFormat>,
    ) -> Result<Shaped> {
        let query = Query::new()
            .param("s", format!("{} {}", symbol, kind.title()))
            .flag(term.as_str());
        let url = self.report_url(&kind.path(), query)?;
        let body = self.fetch_body(&url).await?;

        let rows = parse_report_rows(&body)?;
        let table: Table = rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                let label = cells.next().unwrap_or_default();
                let is_period = label == "Period Ending";
                let mut out = vec![Cell::Text(label)];
                out.extend(cells.map(|v| {
                    if is_period {
                        parse_date(&v).map(Cell::Date).unwrap_or(Cell::Text(v))
                    } else {
                        Cell::Number(report_value(&v))
                    }
                }));
                out
            })
            .collect();

        info!("{} {} ({}): {} line items", symbol, kind.title(), term.as_str(), table.len());
        Ok(shape_columns(table, format.unwrap_or(OutputFormat::ColumnArray)))
    }

    /// Key statistics as `[label, value]` rows (`ColumnArray`).
    pub async fn key_statistics(
        &self,
        symbol: &str,
        format: Option<OutputFormat>,
        numbers: bool,
    ) -> Result<Shaped> {
        let title = "Key Statistics";
        let query = Query::new().param("s", format!("{} {}", symbol, title));
        let url = self.report_url(&initials(title), query)?;
        let body = self.fetch_body(&url).await?;

        let table: Table = parse_key_statistics(&body)?
            .into_iter()
            .map(|(label, value)| {
                let value = match numbers.then(|| to_number(&value)).flatten() {
                    Some(n) => Cell::Number(n),
                    None => Cell::Text(value),
                };
                vec![Cell::Text(label), value]
            })
            .collect();

        info!("{} key statistics: {} fields", symbol, table.len());
        Ok(shape_columns(table, format.unwrap_or(OutputFormat::ColumnArray)))
    }

    /// Price history as of today.
    pub async fn quotes(&self, symbol: &str, options: &QuotesOptions) -> Result<Shaped> {
        self.quotes_as_of(symbol, options, Local::now().date_naive()).await
    }

    /// Price history with defaults resolved against `today`.
    pub async fn quotes_as_of(
        &self,
        symbol: &str,
        options: &QuotesOptions,
        today: NaiveDate,
    ) -> Result<Shaped> {
        let request = options.resolve(today, &self.quote_defaults)?;
        let url = request.query(symbol).build(&self.config.history_url)?;
        let body = self.fetch_body(&url).await?;

        let rows = parse_csv(&body, false)?;
        if rows.is_empty() {
            return Err(FetchError::no_content());
        }

        let table = if request.interval.needs_resampling() {
            let daily = rows_to_quote_table(rows);
            resample(&daily, request.interval, request.end).to_table(request.to_number)
        } else {
            let mut table = to_cells(rows);
            if request.to_number {
                coerce_numbers(&mut table, true, true);
            }
            table
        };

        info!(
            "{} quotes {}..{} ({:?}): {} rows",
            symbol,
            request.begin,
            request.end,
            request.interval,
            table.len().saturating_sub(1)
        );
        Ok(shape_rows(table, request.format))
    }

    /// Annualised volatility of close prices over the requested window.
    pub async fn historical_volatility(
        &self,
        symbol: &str,
        options: &QuotesOptions,
        days_per_year: Option<u32>,
    ) -> Result<f64> {
        let options = QuotesOptions {
            format: Some(OutputFormat::ColumnArray),
            to_number: true,
            ..options.clone()
        };
        let Shaped::Rows(columns) = self.quotes(symbol, &options).await? else {
            return Err(FetchError::Content("unexpected quote shape".to_string()));
        };

        let close = columns
            .iter()
            .find(|col| col.first().and_then(Cell::as_text) == Some("Close"))
            .or_else(|| columns.get(4))
            .ok_or_else(|| FetchError::Content("no close column".to_string()))?;
        let prices: Vec<f64> = close.iter().skip(1).filter_map(Cell::as_number).collect();

        let days = days_per_year.unwrap_or(self.quote_defaults.days_per_year);
        stats::historical_volatility(&prices, days)
            .ok_or_else(|| FetchError::Content(format!("not enough prices for {}", symbol)))
    }

    /// Treasury yield for the maturity (months, default 120) as a fraction.
    pub async fn risk_free_rate(&self, maturity_months: Option<u32>) -> Result<f64> {
        let row = treasury_row(maturity_months.unwrap_or(120));
        let url = Query::new().build(&self.config.bonds_url)?;
        let body = self.fetch_body(&url).await?;

        let text = parse_treasury_yield(&body, row)?;
        to_number(&text)
            .map(|pct| pct / 100.0)
            .ok_or_else(|| FetchError::Content(format!("unreadable yield '{}'", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::http_client::HttpResponse;
    use crate::scraper::http_client::fake::FakeTransport;
    use crate::scraper::parsers::fixtures::{BONDS, CASH_FLOW, KEY_STATS};
    use tokio_test::{assert_err, assert_ok};

    const HISTORY: &str = "Date,Open,High,Low,Close,Volume,Adj Close\n\
        2014-12-19,10.0,12.0,9.0,11.0,100,11.0\n\
        2014-11-03,9.0,10.0,8.0,9.5,200,9.5\n\
        2014-10-01,8.0,9.0,7.0,8.5,301,8.5\n\
        2014-09-30,7.0,8.0,6.0,7.5,400,7.5\n\
        2014-08-15,6.0,7.0,5.0,6.5,500,6.5\n";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn scraper(transport: FakeTransport) -> (Arc<FakeTransport>, YahooScraper) {
        let transport = Arc::new(transport);
        let s = YahooScraper::new(transport.clone(), &AppConfig::default());
        (transport, s)
    }

    #[test]
    fn options_resolve_with_defaults() {
        let req = QuotesOptions::default()
            .resolve(d(2015, 3, 1), &QuotesConfig::default())
            .unwrap();
        assert_eq!(req.interval, Interval::Week);
        assert_eq!(req.end, d(2015, 3, 1));
        assert_eq!(req.begin, d(2012, 3, 1));
        assert_eq!(req.format, OutputFormat::RowArray);
    }

    #[test]
    fn options_reject_term_beyond_calendar_range() {
        let opts = QuotesOptions {
            term_days: Some(1_000_000_000_000_000_000),
            ..Default::default()
        };
        assert!(matches!(
            opts.resolve(d(2015, 3, 1), &QuotesConfig::default()),
            Err(FetchError::InvalidOptions(_))
        ));

        let opts = QuotesOptions { term_days: Some(i64::from(i32::MAX)), ..Default::default() };
        assert!(matches!(
            opts.resolve(d(2015, 3, 1), &QuotesConfig::default()),
            Err(FetchError::InvalidOptions(_))
        ));
    }

    #[test]
    fn options_reject_inverted_range() {
        let opts = QuotesOptions {
            begin: Some(d(2015, 1, 2)),
            end: Some(d(2015, 1, 1)),
            ..Default::default()
        };
        assert!(matches!(
            opts.resolve(d(2015, 3, 1), &QuotesConfig::default()),
            Err(FetchError::InvalidOptions(_))
        ));
    }

    #[test]
    fn history_query_uses_zero_based_months() {
        let req = QuotesRequest {
            interval: Interval::Quarter,
            begin: d(2014, 1, 5),
            end: d(2014, 12, 19),
            format: OutputFormat::RowArray,
            to_number: false,
        };
        let url = req.query("AMZN").build("http://ichart.finance.yahoo.com/table.csv").unwrap();
        assert_eq!(url.query(), Some("g=d&a=0&b=5&c=2014&d=11&e=19&f=2014&s=AMZN"));
    }

    #[test]
    fn treasury_rows_by_maturity() {
        assert_eq!(treasury_row(3), 1);
        assert_eq!(treasury_row(6), 2);
        assert_eq!(treasury_row(12), 3);
        assert_eq!(treasury_row(120), 6);
        assert_eq!(treasury_row(360), 7);
    }

    #[tokio::test]
    async fn fundamentals_default_to_one_row_per_line_item() {
        let transport = FakeTransport::new().always("/q/cf?s=AMZN+Cash+Flow&annual", Ok(HttpResponse::ok(CASH_FLOW)));
        let (_, s) = scraper(transport);

        let shaped = assert_ok!(
            s.fundamentals(StatementKind::CashFlow, "AMZN", ReportTerm::Annual, None).await
        );
        let Shaped::Rows(rows) = shaped else { panic!("expected rows") };
        assert_eq!(rows[0][0], Cell::text("Period Ending"));
        assert_eq!(rows[0][1], Cell::Date(d(2014, 12, 31)));
        assert_eq!(rows[1][1], Cell::Number(-241_000_000.0));
        assert!(rows[2][2].as_number().unwrap().is_nan());
    }

    #[tokio::test]
    async fn fundamentals_as_records() {
        let transport = FakeTransport::new().always("/q/cf", Ok(HttpResponse::ok(CASH_FLOW)));
        let (_, s) = scraper(transport);
        let shaped = assert_ok!(
            s.fundamentals(StatementKind::CashFlow, "AMZN", ReportTerm::Annual, Some(OutputFormat::DictArray))
                .await
        );
        let Shaped::Records(records) = shaped else { panic!("expected records") };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["Net Income"], Cell::Number(274_000_000.0));
    }

    #[tokio::test]
    async fn fundamentals_not_found_is_status_error() {
        let (_, s) = scraper(FakeTransport::new());
        let err = assert_err!(
            s.fundamentals(StatementKind::BalanceSheet, "AAA", ReportTerm::Quarter, None).await
        );
        assert_eq!(err.to_string(), "status code is 404.");
    }

    #[tokio::test]
    async fn fundamentals_without_table_is_content_error() {
        let transport = FakeTransport::new().always("/q/cf", Ok(HttpResponse::ok("<html><body>none</body></html>")));
        let (_, s) = scraper(transport);
        let err = assert_err!(
            s.fundamentals(StatementKind::CashFlow, "AAA", ReportTerm::Annual, None).await
        );
        assert_eq!(err, FetchError::no_content());
    }

    #[tokio::test]
    async fn key_statistics_number_coercion() {
        let transport = FakeTransport::new().always("/q/ks?s=AMZN+Key+Statistics", Ok(HttpResponse::ok(KEY_STATS)));
        let (_, s) = scraper(transport);

        let Shaped::Rows(rows) = assert_ok!(s.key_statistics("AMZN", None, true).await) else {
            panic!("expected rows");
        };
        assert_eq!(rows[0], vec![Cell::text("Market Cap (intraday)"), Cell::Number(178_250_000_000.0)]);
        assert_eq!(rows[1][1], Cell::text("N/A"));
        assert_eq!(rows[2][1], Cell::Number(-0.27));

        let Shaped::Rows(raw) = assert_ok!(s.key_statistics("AMZN", None, false).await) else {
            panic!("expected rows");
        };
        assert_eq!(raw[0][1], Cell::text("178.25B"));
    }

    #[tokio::test]
    async fn empty_history_body_is_content_not_status() {
        let transport = FakeTransport::new().always("table.csv", Ok(HttpResponse::ok("")));
        let (_, s) = scraper(transport);
        let err = assert_err!(s.quotes_as_of("AMZN", &QuotesOptions::default(), d(2015, 1, 1)).await);
        assert_eq!(err, FetchError::no_content());
        assert!(!matches!(err, FetchError::Status(_)));
    }

    #[tokio::test]
    async fn weekly_quotes_pass_through_as_text() {
        let transport = FakeTransport::new().always("table.csv", Ok(HttpResponse::ok(HISTORY)));
        let (t, s) = scraper(transport);
        let Shaped::Rows(rows) = assert_ok!(s.quotes_as_of("AMZN", &QuotesOptions::default(), d(2015, 1, 1)).await)
        else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1][4], Cell::text("11.0"));
        assert!(t.urls()[0].contains("g=w"));
    }

    #[tokio::test]
    async fn quarterly_quotes_are_resampled() {
        let transport = FakeTransport::new().always("table.csv", Ok(HttpResponse::ok(HISTORY)));
        let (t, s) = scraper(transport);
        let opts = QuotesOptions {
            interval: Some(Interval::Quarter),
            end: Some(d(2014, 12, 19)),
            to_number: true,
            ..Default::default()
        };
        let Shaped::Rows(rows) = assert_ok!(s.quotes_as_of("AMZN", &opts, d(2015, 1, 1)).await) else {
            panic!("expected rows");
        };
        assert!(t.urls()[0].contains("g=d"));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], Cell::text("2014-10-01"));
        assert_eq!(rows[1][1], Cell::Number(8.0));
        assert_eq!(rows[1][2], Cell::Number(12.0));
        assert_eq!(rows[1][3], Cell::Number(7.0));
        assert_eq!(rows[1][4], Cell::Number(11.0));
        assert_eq!(rows[1][5], Cell::Number(200.0));
        assert_eq!(rows[2][0], Cell::text("2014-08-15"));
        assert_eq!(rows[2][5], Cell::Number(450.0));
    }

    #[tokio::test]
    async fn volatility_from_close_column() {
        let transport = FakeTransport::new().always("table.csv", Ok(HttpResponse::ok(HISTORY)));
        let (_, s) = scraper(transport);
        let hv = assert_ok!(s.historical_volatility("AMZN", &QuotesOptions::default(), Some(250)).await);
        let closes = [11.0, 9.5, 8.5, 7.5, 6.5];
        assert_eq!(Some(hv), stats::historical_volatility(&closes, 250));
    }

    #[tokio::test]
    async fn volatility_requests_the_given_window() {
        let transport = FakeTransport::new().always("table.csv", Ok(HttpResponse::ok(HISTORY)));
        let (t, s) = scraper(transport);
        let opts = QuotesOptions {
            begin: Some(d(2014, 8, 1)),
            end: Some(d(2014, 12, 19)),
            ..Default::default()
        };
        assert_ok!(s.historical_volatility("AMZN", &opts, None).await);
        assert_eq!(t.urls().len(), 1);
        assert!(t.urls()[0].contains("a=7&b=1&c=2014&d=11&e=19&f=2014&s=AMZN"), "{}", t.urls()[0]);
    }

    #[tokio::test]
    async fn risk_free_rate_reads_ten_year_by_default() {
        let transport = FakeTransport::new().always("/bonds", Ok(HttpResponse::ok(BONDS)));
        let (_, s) = scraper(transport);
        let rate = assert_ok!(s.risk_free_rate(None).await);
        assert!((rate - 0.0211).abs() < 1e-12);
        let short = assert_ok!(s.risk_free_rate(Some(3)).await);
        assert!((short - 0.0002).abs() < 1e-12);
    }

    #[tokio::test]
    async fn resolver_shares_transport() {
        let transport = FakeTransport::new().always(
            "s=GOOGL",
            Ok(HttpResponse::ok(crate::scraper::parsers::fixtures::QUOTE_PAGE)),
        );
        let (t, s) = scraper(transport);
        assert_eq!(assert_ok!(s.resolver().resolve("GOOGL").await), "GOOGL");
        assert_eq!(t.total_calls(), 1);
    }
}
