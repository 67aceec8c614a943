//! Query-string construction for every endpoint.
//!
//! Parameters are listed explicitly per request and encoded by `url`, so there is
//! no trailing separator and no shared mutable defaults.

use crate::error::Result;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
enum Param {
    Pair(String, String),
    Flag(String),
}

/// Ordered list of query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<Param>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// `key=value`
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push(Param::Pair(key.to_string(), value.to_string()));
        self
    }

    /// Bare `key` with no value (e.g. `&annual`).
    pub fn flag(mut self, key: &str) -> Self {
        self.params.push(Param::Flag(key.to_string()));
        self
    }

    /// `base` joined with the parameters, `&`-separated.
    pub fn build(&self, base: &str) -> Result<Url> {
        let mut url = Url::parse(base)?;
        if self.params.is_empty() {
            return Ok(url);
        }
        {
            let mut pairs = url.query_pairs_mut();
            for p in &self.params {
                match p {
                    Param::Pair(k, v) => {
                        pairs.append_pair(k, v);
                    }
                    Param::Flag(k) => {
                        pairs.append_key_only(k);
                    }
                }
            }
        }
        Ok(url)
    }
}
