//! GitHub REST client.

use crate::error::GithubError;
use reqwest::header::{HeaderMap, ACCEPT, LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;

pub const PAGE_SIZE: u32 = 100;
const USER_AGENT: &str = concat!("contribution-tracker/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// One page of a paginated endpoint.
#[derive(Debug, Clone)]
pub struct ApiPage {
    pub body: Value,
    pub has_next: bool,
}

impl ApiPage {
    pub fn new(body: Value, has_next: bool) -> Self {
        Self { body, has_next }
    }
}

/// Page-level access to the API. `path` is relative to the API root and may
/// carry its own query string; paging parameters are appended by the client.
pub trait GithubApi {
    async fn get_page(&self, path: &str, page: u32) -> Result<ApiPage, GithubError>;
}

pub struct GithubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(base_url: impl ToString, token: impl ToString) -> Result<Self, GithubError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string().trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn api_url(&self, path: &str, page: u32) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}per_page={}&page={}",
            self.base_url, path, separator, PAGE_SIZE, page
        )
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<ApiPage, GithubError> {
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let has_next = has_next_link(headers.get(LINK).and_then(|v| v.to_str().ok()));
            let body = response
                .json()
                .await
                .map_err(|e| GithubError::Deserialization(e.to_string()))?;
            return Ok(ApiPage::new(body, has_next));
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(GithubError::RateLimited),
            StatusCode::FORBIDDEN if is_rate_limited(&headers, &message) => {
                Err(GithubError::RateLimited)
            }
            StatusCode::FORBIDDEN => Err(GithubError::Forbidden(message)),
            StatusCode::NOT_FOUND => Err(GithubError::NotFound(message)),
            _ => Err(GithubError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

impl GithubApi for GithubClient {
    async fn get_page(&self, path: &str, page: u32) -> Result<ApiPage, GithubError> {
        let url = self.api_url(path, page);
        tracing::debug!(url = %url, "GET");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;
        self.handle_response(response).await
    }
}

/// True when a `Link` header carries a `rel="next"` relation.
fn has_next_link(link: Option<&str>) -> bool {
    let Some(link) = link else {
        return false;
    };
    link.split(',').any(|part| {
        part.split(';')
            .skip(1)
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"")
    })
}

/// GitHub answers an exhausted quota with 403 and either a zero remaining
/// count, a `Retry-After` header, or a "rate limit" message.
fn is_rate_limited(headers: &HeaderMap, message: &str) -> bool {
    let remaining_zero = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    remaining_zero
        || headers.contains_key(RETRY_AFTER)
        || message.to_ascii_lowercase().contains("rate limit")
}
