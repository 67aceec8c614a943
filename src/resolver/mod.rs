//! Symbol resolution: rewrite a directory ticker into the spellings the quote site
//! might use, then probe them one at a time until a quote page answers.
//!
//! Candidate order matters: earlier entries are the conventional forms, so probing
//! is strictly sequential. Each candidate gets its own retry budget for transport
//! and status failures; a page that loads but is not a quote page moves on at once.

use crate::config::YahooConfig;
use crate::error::{FetchError, Result};
use crate::scraper::http_client::Transport;
use crate::scraper::parsers::has_quote_page_signature;
use crate::scraper::query::Query;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static CLASS_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CL[0-9]").expect("static regex"));

// ── Candidates ────────────────────────────────────────────────────────────────

fn preferred(s: &str) -> String {
    s.replacen('^', "-P", 1)
}

fn class_share(s: &str) -> String {
    s.replacen('/', "-", 1)
}

fn warrant(s: &str) -> String {
    s.replacen("/WS", "-WT", 1)
}

fn when_issued(s: &str) -> String {
    s.replacen('$', "-WI", 1)
}

fn drop_class_series(s: &str) -> String {
    CLASS_SERIES.replace(s, "").into_owned()
}

/// Spellings of `base` under the CQS symbol conventions, most conventional first,
/// duplicates removed keeping the first occurrence.
///
/// `ADK^A` → `[ADK^A, ADK-PA]`, `BRK/B` → `[BRK/B, BRK-B]`.
pub fn candidates(base: &str) -> Vec<String> {
    let rewrites = [
        base.to_string(),
        preferred(base),
        class_share(base),
        warrant(base),
        drop_class_series(base),
        when_issued(base),
        drop_class_series(&preferred(base)),
        drop_class_series(&class_share(base)),
        drop_class_series(&warrant(base)),
    ];

    let mut out: Vec<String> = Vec::with_capacity(rewrites.len());
    for r in rewrites {
        if !out.contains(&r) {
            out.push(r);
        }
    }
    out
}

// ── State machine ─────────────────────────────────────────────────────────────

/// Result of probing one candidate once.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Transport failure or non-200 status.
    Failed(FetchError),
    /// Page loaded but lacks the quote-page structure.
    NotQuotePage,
    /// Page loaded and is a quote page.
    QuotePage,
}

/// Progress of one resolution run. Transitions produce a new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverState {
    pub candidate_index: usize,
    pub retry_count: u32,
    pub resolved: Option<String>,
    pub last_error: Option<FetchError>,
}

impl ResolverState {
    pub fn is_terminal(&self, candidate_count: usize) -> bool {
        self.resolved.is_some() || self.candidate_index >= candidate_count
    }

    /// Next state after probing `candidates[self.candidate_index]`.
    ///
    /// `last_error` is only written when a candidate is abandoned after failures,
    /// and later `NotQuotePage` steps leave it alone: exhaustion reports the most
    /// recent transport or status failure even if the final candidates loaded fine.
    pub fn step(&self, candidates: &[String], outcome: ProbeOutcome, retry_limit: u32) -> Self {
        if self.is_terminal(candidates.len()) {
            return self.clone();
        }
        match outcome {
            ProbeOutcome::Failed(_) if self.retry_count < retry_limit => Self {
                retry_count: self.retry_count + 1,
                ..self.clone()
            },
            ProbeOutcome::Failed(err) => Self {
                candidate_index: self.candidate_index + 1,
                retry_count: 0,
                resolved: None,
                last_error: Some(err),
            },
            ProbeOutcome::NotQuotePage => Self {
                candidate_index: self.candidate_index + 1,
                retry_count: 0,
                ..self.clone()
            },
            ProbeOutcome::QuotePage => Self {
                resolved: Some(candidates[self.candidate_index].clone()),
                ..self.clone()
            },
        }
    }

    /// Terminal state → caller-facing result.
    pub fn finish(self, candidate_count: usize) -> Result<String> {
        match self.resolved {
            Some(symbol) => Ok(symbol),
            None => Err(FetchError::ValidationExhausted {
                tried: candidate_count,
                last_error: self.last_error.map(Box::new),
            }),
        }
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

pub struct SymbolResolver {
    transport: Arc<dyn Transport>,
    quote_page_url: String,
    retry_limit: u32,
}

impl SymbolResolver {
    pub fn new(transport: Arc<dyn Transport>, config: &YahooConfig) -> Self {
        Self {
            transport,
            quote_page_url: config.quote_page_url.clone(),
            retry_limit: config.retry_limit,
        }
    }

    /// Fetch one candidate's quote page and classify it.
    pub async fn probe(&self, candidate: &str) -> ProbeOutcome {
        let url = match Query::new().param("s", candidate).build(&self.quote_page_url) {
            Ok(url) => url,
            Err(e) => return ProbeOutcome::Failed(e),
        };
        match self.transport.get(&url).await.and_then(|r| r.into_body()) {
            Ok(body) if has_quote_page_signature(&body) => ProbeOutcome::QuotePage,
            Ok(_) => ProbeOutcome::NotQuotePage,
            Err(e) => ProbeOutcome::Failed(e),
        }
    }

    /// Probe `candidates` in order until one is a quote page.
    pub async fn validate(&self, candidates: &[String]) -> Result<String> {
        let mut state = ResolverState::default();

        while !state.is_terminal(candidates.len()) {
            let candidate = &candidates[state.candidate_index];
            let outcome = self.probe(candidate).await;
            debug!(
                "probe {} (retry {}): {:?}",
                candidate, state.retry_count, outcome
            );

            if let ProbeOutcome::Failed(err) = &outcome {
                if state.retry_count >= self.retry_limit {
                    warn!("giving up on {} after {} retries: {}", candidate, self.retry_limit, err);
                }
            }
            state = state.step(candidates, outcome, self.retry_limit);
        }

        if let Some(symbol) = &state.resolved {
            info!("resolved symbol {}", symbol);
        }
        state.finish(candidates.len())
    }

    /// `validate(&candidates(base))`.
    pub async fn resolve(&self, base: &str) -> Result<String> {
        let list = candidates(base);
        debug!("{}: {} candidates {:?}", base, list.len(), list);
        self.validate(&list).await
    }
}
