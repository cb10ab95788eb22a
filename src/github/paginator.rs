use crate::error::GithubError;
use crate::github::client::{ApiPage, GithubApi};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use urlencoding::encode;

pub const PAGE_DELAY: Duration = Duration::from_millis(500);
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

pub fn search_path(query: &str) -> String {
    format!("/search/issues?q={}", encode(query))
}

/// Sequential page walker with a fixed delay between pages and an unbounded
/// sleep-and-retry on rate limits.
pub struct Paginator<'a, A> {
    api: &'a A,
    page_delay: Duration,
    cooldown: Duration,
}

impl<'a, A: GithubApi> Paginator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            page_delay: PAGE_DELAY,
            cooldown: RATE_LIMIT_COOLDOWN,
        }
    }

    pub fn with_delays(mut self, page_delay: Duration, cooldown: Duration) -> Self {
        self.page_delay = page_delay;
        self.cooldown = cooldown;
        self
    }

    pub async fn search<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>, GithubError> {
        tracing::debug!(query, "Searching");
        self.fetch_all(&search_path(query)).await
    }

    pub async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, GithubError> {
        self.fetch_until(path, |_: &T| false).await
    }

    /// Like `fetch_all`, but stops after the first page holding an element
    /// that satisfies `stop`. That page is still returned whole.
    pub async fn fetch_until<T, F>(&self, path: &str, stop: F) -> Result<Vec<T>, GithubError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut page = 1;
        let mut results: Vec<T> = vec![];
        loop {
            let api_page = self.fetch_page(path, page).await?;
            let items: Vec<T> = decode_items(api_page.body)?;
            let found = items.iter().any(&stop);
            results.extend(items);
            if found || !api_page.has_next {
                break;
            }
            page += 1;
            sleep(self.page_delay).await;
        }
        Ok(results)
    }

    /// Single-object endpoint, with the same rate-limit handling.
    pub async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<T, GithubError> {
        let api_page = self.fetch_page(path, 1).await?;
        serde_json::from_value(api_page.body).map_err(|e| GithubError::Deserialization(e.to_string()))
    }

    async fn fetch_page(&self, path: &str, page: u32) -> Result<ApiPage, GithubError> {
        loop {
            match self.api.get_page(path, page).await {
                Err(GithubError::RateLimited) => {
                    tracing::warn!(
                        path,
                        page,
                        cooldown_secs = self.cooldown.as_secs(),
                        "Rate limit hit, waiting before retrying the same page"
                    );
                    sleep(self.cooldown).await;
                }
                other => return other,
            }
        }
    }
}

/// List endpoints return a bare array; search wraps results in `items`.
fn decode_items<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, GithubError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(GithubError::Deserialization(
                    "expected an `items` array".into(),
                ))
            }
        },
        other => {
            return Err(GithubError::Deserialization(format!(
                "expected a list, got {other}"
            )))
        }
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).map_err(|e| GithubError::Deserialization(e.to_string()))
        })
        .collect()
}
