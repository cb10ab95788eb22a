//! JSON payload builders shaped like GitHub responses.

use crate::model::Settings;
use serde_json::{json, Value};

pub fn settings(username: &str) -> Settings {
    Settings::new(username, Some("test-token".to_string())).unwrap()
}

pub fn search_page(items: Vec<Value>) -> Value {
    json!({
        "total_count": items.len(),
        "incomplete_results": false,
        "items": items,
    })
}

pub fn pull_item(owner: &str, repo: &str, number: u64, author: &str) -> Value {
    json!({
        "number": number,
        "title": format!("PR {number} in {owner}/{repo}"),
        "html_url": format!("https://github.com/{owner}/{repo}/pull/{number}"),
        "repository_url": format!("https://api.github.com/repos/{owner}/{repo}"),
        "body": "Some body",
        "state": "open",
        "user": { "login": author, "type": "User" },
        "created_at": "2024-02-01T10:00:00Z",
        "updated_at": "2024-02-10T10:00:00Z",
        "closed_at": null,
        "pull_request": { "merged_at": null }
    })
}

pub fn merged_pull_item(owner: &str, repo: &str, number: u64, author: &str, merged_at: &str) -> Value {
    let mut item = pull_item(owner, repo, number, author);
    item["state"] = json!("closed");
    item["closed_at"] = json!(merged_at);
    item["pull_request"]["merged_at"] = json!(merged_at);
    item
}

pub fn bot_pull_item(owner: &str, repo: &str, number: u64) -> Value {
    let mut item = pull_item(owner, repo, number, "dependabot[bot]");
    item["user"]["type"] = json!("Bot");
    item
}

pub fn issue_item(owner: &str, repo: &str, number: u64, author: &str) -> Value {
    json!({
        "number": number,
        "title": format!("Issue {number} in {owner}/{repo}"),
        "html_url": format!("https://github.com/{owner}/{repo}/issues/{number}"),
        "repository_url": format!("https://api.github.com/repos/{owner}/{repo}"),
        "body": null,
        "state": "closed",
        "user": { "login": author, "type": "User" },
        "created_at": "2024-01-05T08:00:00Z",
        "updated_at": "2024-01-09T08:00:00Z",
        "closed_at": "2024-01-08T08:00:00Z"
    })
}

pub fn repository(private: bool) -> Value {
    json!({ "private": private })
}

pub fn commit(login: Option<&str>, email: &str, date: &str, message: &str) -> Value {
    json!({
        "sha": format!("sha-{date}"),
        "author": login.map(|l| json!({ "login": l, "type": "User" })),
        "commit": {
            "author": { "name": "Some Person", "email": email, "date": date },
            "message": message
        },
        "parents": [{ "sha": "parent" }]
    })
}

pub fn review(login: &str, state: &str, submitted_at: &str) -> Value {
    json!({
        "user": { "login": login, "type": "User" },
        "state": state,
        "submitted_at": submitted_at
    })
}

pub fn comment(login: &str, created_at: &str) -> Value {
    json!({
        "user": { "login": login, "type": "User" },
        "created_at": created_at
    })
}
