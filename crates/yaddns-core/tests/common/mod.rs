//! Test doubles and common utilities for contract tests
//!
//! [`FakeTransport`] replays scripted replies per route and records every
//! request it receives, so tests can assert on exactly which calls a run made.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use yaddns_core::config::{DiscoveryConfig, LookupConfig, SyncConfig};
use yaddns_core::error::{Error, Result};
use yaddns_core::traits::{HttpMethod, HttpRequest, HttpTransport};

pub const API_BASE: &str = "https://api.test/api2/admin";
pub const IP_URL: &str = "http://ip.test/raw";
pub const TOKEN: &str = "test-token";

/// What the fake answers for a route
#[derive(Debug, Clone)]
pub enum Reply {
    /// HTTP 200 with this body
    Body(String),
    /// Non-200 status
    Status(u16),
    /// Connection-level failure
    Fail(String),
}

struct Route {
    method: HttpMethod,
    url_prefix: String,
    replies: VecDeque<Reply>,
}

/// Scripted transport
///
/// Replies registered for the same route are served in order; the last one
/// is repeated once the queue is down to a single entry.
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    call_count: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn on(self, method: HttpMethod, url_prefix: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.url_prefix == url_prefix)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    url_prefix: url_prefix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn on_get(self, url_prefix: &str, reply: Reply) -> Self {
        self.on(HttpMethod::Get, url_prefix, reply)
    }

    pub fn on_post(self, url_prefix: &str, reply: Reply) -> Self {
        self.on(HttpMethod::Post, url_prefix, reply)
    }

    /// Total number of requests executed
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// All requests, in execution order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// POST requests only
    pub fn posts(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == HttpMethod::Post)
            .collect()
    }

    /// `record_id` form values of every POST, in order
    pub fn updated_record_ids(&self) -> Vec<String> {
        self.posts()
            .iter()
            .filter_map(|r| {
                r.form.as_ref().and_then(|form| {
                    form.iter()
                        .find(|(k, _)| k == "record_id")
                        .map(|(_, v)| v.clone())
                })
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes
                .iter_mut()
                .find(|r| r.method == request.method && request.url.starts_with(&r.url_prefix));
            match route {
                Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
                Some(route) => route.replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Body(body)) => Ok(body.into_bytes()),
            Some(Reply::Status(status)) => Err(Error::http_status(status, &request.url)),
            Some(Reply::Fail(msg)) => Err(Error::transport(msg)),
            None => Err(Error::transport(format!(
                "no scripted reply for {} {}",
                request.method.as_str(),
                request.url
            ))),
        }
    }
}

/// `dns/list` body; records are `(record_id, fqdn, type, content)`
pub fn list_body(domain: &str, records: &[(u64, &str, &str, &str)]) -> String {
    let records: Vec<serde_json::Value> = records
        .iter()
        .map(|(id, fqdn, record_type, content)| {
            serde_json::json!({
                "record_id": id,
                "fqdn": fqdn,
                "type": record_type,
                "content": content,
                "domain": domain,
                "subdomain": fqdn.trim_end_matches(&format!(".{}", domain)),
                "ttl": 900,
            })
        })
        .collect();

    serde_json::json!({
        "domain": domain,
        "records": records,
        "success": "ok",
    })
    .to_string()
}

/// The three-record set used throughout the contract tests
pub fn standard_list_body() -> String {
    list_body(
        "example.com",
        &[
            (1, "a.example.com", "A", "198.51.100.1"),
            (2, "home.example.com", "A", "198.51.100.2"),
            (3, "home.example.com", "CNAME", "a.example.com."),
        ],
    )
}

/// Successful `dns/edit` body
pub fn edit_ok(record_id: u64) -> String {
    serde_json::json!({
        "domain": "example.com",
        "record_id": record_id,
        "record": {
            "record_id": record_id,
            "fqdn": "home.example.com",
            "type": "A",
            "content": "203.0.113.5",
            "ttl": 900,
            "operation": "edited",
        },
        "success": "ok",
    })
    .to_string()
}

/// Failed `dns/edit` body
pub fn edit_error(message: &str) -> String {
    serde_json::json!({
        "domain": "example.com",
        "success": "error",
        "error": message,
    })
    .to_string()
}

/// Minimal configuration pointing at the fake endpoints
pub fn test_config(subdomain: &str) -> SyncConfig {
    SyncConfig::new(TOKEN, "example.com", subdomain, 900)
        .with_api_base(API_BASE)
        .with_discovery(DiscoveryConfig {
            ipv4: Some(LookupConfig::plain(IP_URL)),
            ipv6: None,
        })
}

/// Transport serving the standard record set, a plain-body IP and
/// successful edits
pub fn happy_transport() -> FakeTransport {
    FakeTransport::new()
        .on_get(IP_URL, Reply::Body(" 203.0.113.5 \r\n".into()))
        .on_get(&format!("{}/dns/list", API_BASE), Reply::Body(standard_list_body()))
        .on_post(&format!("{}/dns/edit", API_BASE), Reply::Body(edit_ok(2)))
}
