use crate::config::HttpConfig;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Status and body of one GET.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    /// Body of a 200 response, `Status` error otherwise.
    pub fn into_body(self) -> Result<String> {
        if self.status == 200 {
            Ok(self.body)
        } else {
            Err(FetchError::Status(self.status))
        }
    }
}

/// Single-request transport. Swappable so fetch logic can run against fixtures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()?;

        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        debug!("GET {}", url);

        let resp = self.inner.get(url.clone()).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted in-memory transport for offline tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Route {
        needle: String,
        queued: VecDeque<Result<HttpResponse>>,
        fallback: Result<HttpResponse>,
    }

    /// Serves scripted responses to URLs containing a needle; anything else gets a 404.
    #[derive(Default)]
    pub struct FakeTransport {
        routes: Mutex<Vec<Route>>,
        log: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every request whose URL contains `needle` gets `response`.
        pub fn always(self, needle: &str, response: Result<HttpResponse>) -> Self {
            self.sequence(needle, Vec::new(), response)
        }

        /// Requests matching `needle` get `responses` in order, then `fallback` forever.
        pub fn sequence(
            self,
            needle: &str,
            responses: Vec<Result<HttpResponse>>,
            fallback: Result<HttpResponse>,
        ) -> Self {
            self.routes.lock().unwrap().push(Route {
                needle: needle.to_string(),
                queued: responses.into(),
                fallback,
            });
            self
        }

        pub fn calls(&self, needle: &str) -> usize {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.contains(needle))
                .count()
        }

        pub fn total_calls(&self) -> usize {
            self.log.lock().unwrap().len()
        }

        pub fn urls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse> {
            let url = url.to_string();
            self.log.lock().unwrap().push(url.clone());

            let mut routes = self.routes.lock().unwrap();
            match routes.iter_mut().find(|r| url.contains(r.needle.as_str())) {
                Some(route) => route
                    .queued
                    .pop_front()
                    .unwrap_or_else(|| route.fallback.clone()),
                None => Ok(HttpResponse { status: 404, body: String::new() }),
            }
        }
    }
}
