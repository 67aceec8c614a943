use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Interval;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub yahoo: YahooConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
}

/// Transport settings shared by every request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Company directory (26-shard batch) settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_url")]
    pub base_url: String,

    /// Shard `n` (1-based) is dispatched after `n * stagger_ms`.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    #[serde(default = "default_heartbeat_letter")]
    pub heartbeat_letter: String,
}

/// Quote pages, financial reports, price history and bond yields
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YahooConfig {
    #[serde(default = "default_quote_page_url")]
    pub quote_page_url: String,

    #[serde(default = "default_report_base_url")]
    pub report_base_url: String,

    #[serde(default = "default_history_url")]
    pub history_url: String,

    #[serde(default = "default_bonds_url")]
    pub bonds_url: String,

    /// Retries per symbol candidate before it is abandoned.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

/// Defaults applied to quote requests that leave fields unset
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotesConfig {
    #[serde(default)]
    pub interval: Interval,

    #[serde(default = "default_term_days")]
    pub term_days: i64,

    #[serde(default = "default_days_per_year")]
    pub days_per_year: u32,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "market-scraper/0.1 (research project; directory, fundamentals and quotes)".to_string()
}
fn default_directory_url() -> String {
    "http://www.nasdaq.com/screening/companies-by-name.aspx".to_string()
}
fn default_stagger_ms() -> u64 {
    1000
}
fn default_heartbeat_letter() -> String {
    ".".to_string()
}
fn default_quote_page_url() -> String {
    "http://finance.yahoo.com/q".to_string()
}
fn default_report_base_url() -> String {
    "http://finance.yahoo.com/q".to_string()
}
fn default_history_url() -> String {
    "http://ichart.finance.yahoo.com/table.csv".to_string()
}
fn default_bonds_url() -> String {
    "http://finance.yahoo.com/bonds".to_string()
}
fn default_retry_limit() -> u32 {
    5
}
fn default_term_days() -> i64 {
    365 * 3
}
fn default_days_per_year() -> u32 {
    250
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_directory_url(),
            stagger_ms: default_stagger_ms(),
            heartbeat_letter: default_heartbeat_letter(),
        }
    }
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            quote_page_url: default_quote_page_url(),
            report_base_url: default_report_base_url(),
            history_url: default_history_url(),
            bonds_url: default_bonds_url(),
            retry_limit: default_retry_limit(),
        }
    }
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            interval: Interval::default(),
            term_days: default_term_days(),
            days_per_year: default_days_per_year(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            directory: DirectoryConfig::default(),
            yahoo: YahooConfig::default(),
            quotes: QuotesConfig::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("MKT").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize()?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    /// Reject settings that would make requests meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.yahoo.retry_limit > 100 {
            anyhow::bail!("yahoo.retry_limit {} is unreasonably large", self.yahoo.retry_limit);
        }
        if self.quotes.term_days <= 0 {
            anyhow::bail!("quotes.term_days must be positive, got {}", self.quotes.term_days);
        }
        if self.directory.heartbeat_letter.is_empty() {
            anyhow::bail!("directory.heartbeat_letter must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.yahoo.retry_limit, 5);
        assert_eq!(cfg.directory.stagger_ms, 1000);
        assert_eq!(cfg.quotes.term_days, 1095);
        assert_eq!(cfg.quotes.interval, Interval::Week);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_term() {
        let mut cfg = AppConfig::default();
        cfg.quotes.term_days = 0;
        assert!(cfg.validate().is_err());
    }
}
