use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::FetchError;
use crate::http_client::http_client;

/// Abort signal shared between a panel and the worker running its request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl PanelRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `path?k=v&...`, for logs and diagnostics.
    pub fn describe(&self) -> String {
        if self.query.is_empty() {
            return self.path.to_string();
        }
        let qs = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{qs}", self.path)
    }
}

/// A source of JSON payloads. Runs on a worker thread and blocks until done.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: &PanelRequest, cancel: &CancelToken) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, request: &PanelRequest, cancel: &CancelToken) -> Result<Value, FetchError> {
        cancel.check()?;
        let client = http_client().map_err(FetchError::transport)?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut req = client.get(&url).query(&request.query);
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().map_err(|err| map_send_error(err, request.timeout))?;
        // Dropping the response here closes the connection before the body is read.
        cancel.check()?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| map_send_error(err, request.timeout))?;
        cancel.check()?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail: error_detail(status, &body),
            });
        }

        parse_payload(&body)
    }
}

pub fn parse_payload(body: &str) -> Result<Value, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(FetchError::parse("empty body"));
    }
    serde_json::from_str(trimmed).map_err(FetchError::parse)
}

fn map_send_error(err: reqwest::Error, timeout: Option<Duration>) -> FetchError {
    if err.is_timeout() {
        if let Some(after) = timeout {
            return FetchError::Timeout { after };
        }
    }
    FetchError::transport(err)
}

// FastAPI reports failures as {"detail": "..."}; fall back to the reason phrase.
fn error_detail(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("detail")
            .or_else(|| v.get("error"))
            .map(|d| match d {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    });
    if let Some(detail) = from_json.filter(|d| !d.trim().is_empty()) {
        return detail;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fastapi_detail_is_surfaced() {
        let detail = error_detail(
            StatusCode::BAD_GATEWAY,
            r#"{"detail":"Upstream API error: boom"}"#,
        );
        assert_eq!(detail, "Upstream API error: boom");
    }

    #[test]
    fn empty_body_falls_back_to_reason() {
        assert_eq!(error_detail(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn describe_joins_query() {
        let req = PanelRequest {
            path: "/nba/narrative/markdown",
            query: vec![
                ("mode".to_string(), "ai".to_string()),
                ("cache_ttl".to_string(), "0".to_string()),
            ],
            timeout: None,
        };
        assert_eq!(req.describe(), "/nba/narrative/markdown?mode=ai&cache_ttl=0");
        assert_eq!(req.query_value("mode"), Some("ai"));
        assert_eq!(req.query_value("trends"), None);
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let err = parse_payload("{not json").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }
}
