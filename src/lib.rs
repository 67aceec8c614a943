//! Company directories, financial statements, key statistics and price history
//! scraped from two public web sources, normalised into tables.
//!
//! - [`pipeline`]: 26-shard directory batch with a heartbeat gate
//! - [`resolver`]: directory ticker → quote-site symbol
//! - [`resample`]: daily bars → monthly / quarterly bars
//! - [`scraper`]: transport, HTML extraction and the per-endpoint fetches

pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod resample;
pub mod resolver;
pub mod scraper;
pub mod stats;
pub mod table;
pub mod utils;

pub use error::{FetchError, Result};
