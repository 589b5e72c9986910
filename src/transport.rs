use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::{CollectError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitHeaders {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
        Self { remaining, reset_at }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub rate_limit: RateLimitHeaders,
    /// Parsed JSON, present only for 2xx responses.
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A 403 with an exhausted quota is flow control, not a failure.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 403 && self.rate_limit.remaining == Some(0)
    }
}

pub trait Transport {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(token: Option<&str>, user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut auth = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|e| CollectError::Transport(e.to_string()))?;
            auth.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth);
        }
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(&str, String)]) -> Result<ApiResponse> {
        let resp = self.client.get(url).query(params).send()?;
        let status = resp.status();
        let rate_limit = RateLimitHeaders::from_headers(resp.headers());
        let body = if status.is_success() {
            Some(resp.json::<Value>()?)
        } else {
            None
        };
        Ok(ApiResponse {
            status: status.as_u16(),
            rate_limit,
            body,
        })
    }
}
