//! In-memory `GithubApi` that serves canned pages and records every call.

use crate::error::GithubError;
use crate::github::client::ApiPage;
use crate::github::GithubApi;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Response {
    Page(ApiPage),
    RateLimited,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
}

impl Response {
    fn into_result(self, path: &str) -> Result<ApiPage, GithubError> {
        match self {
            Response::Page(page) => Ok(page),
            Response::RateLimited => Err(GithubError::RateLimited),
            Response::Unauthorized => Err(GithubError::Api {
                status: 401,
                message: "Bad credentials".into(),
            }),
            Response::Forbidden => Err(GithubError::Forbidden(path.to_string())),
            Response::NotFound => Err(GithubError::NotFound(path.to_string())),
            Response::ServerError => Err(GithubError::Api {
                status: 502,
                message: "bad gateway".into(),
            }),
        }
    }
}

/// Responses are queued per `(path, page)`. The last queued response repeats,
/// unknown paths answer 404.
#[derive(Default)]
pub struct FakeGithub {
    responses: Mutex<HashMap<(String, u32), VecDeque<Response>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `pages` as pages 1..n, each but the last advertising a next page.
    pub fn with_pages(self, path: &str, pages: Vec<Value>) -> Self {
        {
            let mut responses = self.responses.lock().unwrap();
            let last = pages.len().saturating_sub(1);
            for (index, body) in pages.into_iter().enumerate() {
                let page = ApiPage::new(body, index < last);
                responses.insert(
                    (path.to_string(), index as u32 + 1),
                    VecDeque::from([Response::Page(page)]),
                );
            }
        }
        self
    }

    /// Answers `times` rate-limit errors before the queued page.
    pub fn with_rate_limits(self, path: &str, page: u32, times: usize) -> Self {
        {
            let mut responses = self.responses.lock().unwrap();
            let queue = responses.entry((path.to_string(), page)).or_default();
            for _ in 0..times {
                queue.push_front(Response::RateLimited);
            }
        }
        self
    }

    pub fn with_unauthorized(self, path: &str) -> Self {
        self.with_response(path, Response::Unauthorized)
    }

    pub fn with_forbidden(self, path: &str) -> Self {
        self.with_response(path, Response::Forbidden)
    }

    pub fn with_server_error(self, path: &str) -> Self {
        self.with_response(path, Response::ServerError)
    }

    fn with_response(self, path: &str, response: Response) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((path.to_string(), 1), VecDeque::from([response]));
        self
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .count()
    }

    pub fn called_with_prefix(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.starts_with(prefix))
            .count()
    }
}

impl GithubApi for FakeGithub {
    async fn get_page(&self, path: &str, page: u32) -> Result<ApiPage, GithubError> {
        self.calls.lock().unwrap().push((path.to_string(), page));
        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(&(path.to_string(), page)) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        response
            .unwrap_or(Response::NotFound)
            .into_result(path)
    }
}
