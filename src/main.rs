use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use market_scraper::config::AppConfig;
use market_scraper::loader::load_quote_csv;
use market_scraper::models::{Interval, OutputFormat, ReportTerm, StatementKind};
use market_scraper::pipeline::DirectoryBatch;
use market_scraper::resample::resample;
use market_scraper::scraper::http_client::{HttpClient, Transport};
use market_scraper::scraper::{QuotesOptions, YahooScraper};
use market_scraper::table::shape_rows;
use market_scraper::utils::{self, fmt_count};

#[derive(Parser)]
#[command(name = "market-scraper", about = "Company directory, fundamentals and quotes scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    CashFlow,
    IncomeStatement,
    BalanceSheet,
}

impl From<Kind> for StatementKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::CashFlow => StatementKind::CashFlow,
            Kind::IncomeStatement => StatementKind::IncomeStatement,
            Kind::BalanceSheet => StatementKind::BalanceSheet,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Download the company directory, one letter at a time
    Companies {
        /// Emit one object per company instead of header + rows
        #[arg(long)]
        dict: bool,
    },

    /// Find the quote-site spelling of a directory ticker
    Resolve { symbol: String },

    /// Cash flow, income statement or balance sheet
    Fundamentals {
        symbol: String,
        #[arg(long, value_enum, default_value = "cash-flow")]
        kind: Kind,
        #[arg(long)]
        quarterly: bool,
        /// rowArray | columnArray | dictArray
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Key statistics page
    Statistics {
        symbol: String,
        #[arg(long)]
        format: Option<OutputFormat>,
        #[arg(long)]
        to_number: bool,
    },

    /// Historical quotes
    Quotes {
        symbol: String,
        /// day | week | month | quarter
        #[arg(long)]
        interval: Option<Interval>,
        #[arg(long)]
        begin: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        term_days: Option<i64>,
        #[arg(long)]
        format: Option<OutputFormat>,
        #[arg(long)]
        to_number: bool,
    },

    /// Annualised volatility of close prices
    Volatility {
        symbol: String,
        #[arg(long)]
        begin: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        term_days: Option<i64>,
        #[arg(long)]
        days_per_year: Option<u32>,
    },

    /// Treasury yield as a fraction
    RiskFreeRate {
        #[arg(long)]
        maturity_months: Option<u32>,
    },

    /// Resample a local daily quote CSV
    Resample {
        file: PathBuf,
        /// month | quarter
        #[arg(long, default_value = "month")]
        interval: Interval,
        /// Reference date for the most recent window (default: last row's date)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "market_scraper=info,warn",
        1 => "market_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let transport: Arc<dyn Transport> =
        Arc::new(HttpClient::new(&config.http).context("Failed to build HTTP client")?);
    let yahoo = YahooScraper::new(Arc::clone(&transport), &config);

    match cli.command {
        Command::Companies { dict } => {
            let _t = utils::Timer::start("Company directory");
            let format = if dict { OutputFormat::DictArray } else { OutputFormat::RowArray };
            let batch = DirectoryBatch::new(transport, config.directory.clone());

            let mut out = Vec::new();
            let stats = batch
                .run(format, |report| {
                    let letter = report.shard.map(|s| s.letter.to_string());
                    match report.result {
                        Ok(rows) => out.push(serde_json::json!({ "letter": letter, "rows": rows })),
                        Err(e) => warn!("{}: {}", letter.unwrap_or_else(|| "batch".into()), e),
                    }
                })
                .await;
            print_json(&out)?;
            info!(
                "Done: {} shards, {} ok, {} failed",
                fmt_count(stats.shards_reported),
                stats.succeeded,
                stats.failed
            );
        }

        Command::Resolve { symbol } => {
            let resolved = yahoo.resolver().resolve(&symbol).await?;
            println!("{}", resolved);
        }

        Command::Fundamentals { symbol, kind, quarterly, format } => {
            let term = if quarterly { ReportTerm::Quarter } else { ReportTerm::Annual };
            let report = yahoo.fundamentals(kind.into(), &symbol, term, format).await?;
            print_json(&report)?;
        }

        Command::Statistics { symbol, format, to_number } => {
            let stats = yahoo.key_statistics(&symbol, format, to_number).await?;
            print_json(&stats)?;
        }

        Command::Quotes { symbol, interval, begin, end, term_days, format, to_number } => {
            let options = QuotesOptions { interval, begin, end, term_days, format, to_number };
            let quotes = yahoo.quotes(&symbol, &options).await?;
            info!("{}: {} rows", symbol, fmt_count(quotes.len()));
            print_json(&quotes)?;
        }

        Command::Volatility { symbol, begin, end, term_days, days_per_year } => {
            let options = QuotesOptions { begin, end, term_days, ..Default::default() };
            let hv = yahoo.historical_volatility(&symbol, &options, days_per_year).await?;
            println!("{}", hv);
        }

        Command::RiskFreeRate { maturity_months } => {
            println!("{}", yahoo.risk_free_rate(maturity_months).await?);
        }

        Command::Resample { file, interval, end } => {
            let daily = load_quote_csv(&file)?;
            let end = end
                .or_else(|| daily.records.iter().map(|r| r.date).max())
                .context("No dated rows in file")?;
            let bars = resample(&daily, interval, end);
            print_json(&shape_rows(bars.to_table(true), OutputFormat::RowArray))?;
        }
    }

    Ok(())
}
