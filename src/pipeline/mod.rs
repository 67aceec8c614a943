//! Company directory batch: one logical listing split into 26 alphabetic shards.
//!
//! ## Flow
//!
//! 1. Heartbeat: one cheap request (`letter=.`). If it fails, the handler is called
//!    once with the error and `is_last = true`, and no shard is requested.
//! 2. Shards `A`..`Z` are spawned, shard `n` (1-based) waiting `n * stagger_ms`
//!    before its request. Waiting spreads the load; it does not order completions.
//! 3. Each finished shard is reported to the handler as it completes, success or
//!    failure. A failed shard never cancels its siblings.
//!
//! Completion counting happens only in the consumer loop, so exactly one report
//! carries `is_last = true`.

use crate::config::DirectoryConfig;
use crate::error::{FetchError, Result};
use crate::models::{OutputFormat, Record, ShardJob, Shaped};
use crate::scraper::http_client::Transport;
use crate::scraper::query::Query;
use crate::table::{coerce_numbers, parse_csv, shape_rows, to_cells};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Completion bookkeeping for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchState {
    pub total_shards: usize,
    pub completed: usize,
}

impl BatchState {
    pub fn new(total_shards: usize) -> Self {
        Self { total_shards, completed: 0 }
    }

    /// Count one finished shard; true if it was the final one.
    pub fn record_completion(&mut self) -> bool {
        self.completed += 1;
        self.completed == self.total_shards
    }
}

/// What the handler receives, once per shard (or once for a failed heartbeat).
#[derive(Debug, Clone)]
pub struct ShardReport {
    /// `None` for the heartbeat-abort report.
    pub shard: Option<ShardJob>,
    pub result: Result<Shaped>,
    pub is_last: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub shards_reported: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Every record from every shard that succeeded, plus each shard's error.
#[derive(Debug, Default)]
pub struct CompanyDirectory {
    pub records: Vec<Record>,
    pub errors: Vec<FetchError>,
}

pub struct DirectoryBatch {
    transport: Arc<dyn Transport>,
    config: DirectoryConfig,
}

impl DirectoryBatch {
    pub fn new(transport: Arc<dyn Transport>, config: DirectoryConfig) -> Self {
        Self { transport, config }
    }

    fn listing_url(&self, letter: &str) -> Result<Url> {
        Query::new()
            .param("render", "download")
            .param("letter", letter)
            .build(&self.config.base_url)
    }

    async fn heartbeat(&self) -> Result<()> {
        let url = self.listing_url(&self.config.heartbeat_letter)?;
        debug!("heartbeat {}", url);
        self.transport.get(&url).await?.into_body().map(|_| ())
    }

    /// Run the batch, calling `handler` per shard as results arrive.
    pub async fn run<F>(&self, format: OutputFormat, mut handler: F) -> BatchStats
    where
        F: FnMut(ShardReport),
    {
        let mut stats = BatchStats::default();

        if let Err(e) = self.heartbeat().await {
            warn!("heartbeat failed, skipping all shards: {}", e);
            handler(ShardReport {
                shard: None,
                result: Err(FetchError::Heartbeat(Box::new(e))),
                is_last: true,
            });
            stats.shards_reported = 1;
            stats.failed = 1;
            return stats;
        }

        let jobs = ShardJob::all();
        let mut state = BatchState::new(jobs.len());
        let mut set = JoinSet::new();
        let mut by_task = HashMap::new();

        for job in jobs {
            let transport = Arc::clone(&self.transport);
            let url = self.listing_url(&job.letter.to_string());
            let delay = Duration::from_millis(self.config.stagger_ms * (job.index as u64 + 1));

            let handle = set.spawn(async move {
                tokio::time::sleep(delay).await;
                match url {
                    Ok(url) => fetch_shard(transport.as_ref(), &url, format).await,
                    Err(e) => Err(e),
                }
            });
            by_task.insert(handle.id(), job);
        }

        info!("dispatched {} directory shards", by_task.len());

        while let Some(joined) = set.join_next_with_id().await {
            let (job, result) = match joined {
                Ok((id, result)) => (by_task.get(&id).copied(), result),
                Err(e) => {
                    error!("shard task failed: {}", e);
                    (
                        by_task.get(&e.id()).copied(),
                        Err(FetchError::Transport(format!("shard task failed: {}", e))),
                    )
                }
            };

            let is_last = state.record_completion();
            match &result {
                Ok(rows) => {
                    stats.succeeded += 1;
                    info!(
                        "shard {} done: {} rows ({}/{})",
                        job.map(|j| j.letter).unwrap_or('?'),
                        rows.len(),
                        state.completed,
                        state.total_shards
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(
                        "shard {} failed: {} ({}/{})",
                        job.map(|j| j.letter).unwrap_or('?'),
                        e,
                        state.completed,
                        state.total_shards
                    );
                }
            }
            stats.shards_reported += 1;
            handler(ShardReport { shard: job, result, is_last });
        }

        stats
    }

    /// Whole directory as dictionaries, gathered until the last report.
    pub async fn collect_all(&self) -> CompanyDirectory {
        let mut directory = CompanyDirectory::default();
        self.run(OutputFormat::DictArray, |report| match report.result {
            Ok(Shaped::Records(records)) => directory.records.extend(records),
            Ok(Shaped::Rows(_)) => {}
            Err(e) => directory.errors.push(e),
        })
        .await;
        directory
    }
}

/// Fetch one letter's CSV and shape it; numeric cells are typed.
async fn fetch_shard(transport: &dyn Transport, url: &Url, format: OutputFormat) -> Result<Shaped> {
    let body = transport.get(url).await?.into_body()?;
    let rows = parse_csv(&body, true)?;
    if rows.is_empty() {
        return Err(FetchError::no_content());
    }
    let mut table = to_cells(rows);
    coerce_numbers(&mut table, true, false);
    Ok(shape_rows(table, format))
}
