//! Live people-search over HTTP.

use std::time::Duration;

use phone_enrich_match::Candidate;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::parser::parse_result_page;
use crate::query::LookupQuery;
use crate::{LookupError, PeopleSearch};

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

/// Connection and retry settings of the live lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_sec: f64,
    pub backoff_max_sec: f64,
    /// Rotated in order whenever the site answers 403/429.
    pub user_agents: Vec<String>,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.anywho.com".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            backoff_base_sec: 2.0,
            backoff_max_sec: 30.0,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// [`PeopleSearch`] against the live site.
pub struct HttpPeopleSearch {
    client: Client,
    base_url: Url,
    user_agents: Vec<String>,
    agent_index: usize,
}

impl HttpPeopleSearch {
    pub fn new(settings: &LookupSettings) -> Result<Self, LookupError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            LookupError::permanent(format!("invalid base url {:?}: {e}", settings.base_url))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        if let Ok(referer) = HeaderValue::from_str(base_url.as_str()) {
            headers.insert(REFERER, referer);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| LookupError::permanent(format!("failed to build http client: {e}")))?;

        let mut user_agents: Vec<String> = settings
            .user_agents
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if user_agents.is_empty() {
            user_agents = DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect();
        }

        Ok(Self {
            client,
            base_url,
            user_agents,
            agent_index: 0,
        })
    }

    pub fn current_user_agent(&self) -> &str {
        &self.user_agents[self.agent_index % self.user_agents.len()]
    }

    fn rotate_user_agent(&mut self) {
        self.agent_index = (self.agent_index + 1) % self.user_agents.len();
        tracing::debug!(user_agent = %self.current_user_agent(), "rotated user agent");
    }

    fn fetch_page(&mut self, url: &Url) -> Result<String, LookupError> {
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.current_user_agent())
            .send()
            .map_err(|e| classify_send_error(url, e))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .text()
                .map_err(|e| LookupError::transient(format!("failed to read body for {url}: {e}")));
        }

        match status {
            StatusCode::NOT_FOUND => Ok(String::new()),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(&resp);
                self.rotate_user_agent();
                Err(LookupError::Transient {
                    message: format!("blocked with http status {status} for {url}"),
                    retry_after,
                })
            }
            s if s.is_server_error() || s == StatusCode::REQUEST_TIMEOUT => {
                Err(LookupError::Transient {
                    message: format!("http status {status} for {url}"),
                    retry_after: parse_retry_after(&resp),
                })
            }
            _ => Err(LookupError::permanent(format!(
                "http status {status} for {url}"
            ))),
        }
    }
}

impl PeopleSearch for HttpPeopleSearch {
    fn search(&mut self, query: &LookupQuery) -> Result<Vec<Candidate>, LookupError> {
        let url = query.url(&self.base_url)?;
        tracing::debug!(url = %url, "people search");
        let body = self.fetch_page(&url)?;
        if body.is_empty() {
            return Ok(Vec::new());
        }
        Ok(parse_result_page(&body))
    }
}

fn classify_send_error(url: &Url, err: reqwest::Error) -> LookupError {
    if err.is_builder() {
        LookupError::permanent(format!("invalid request for {url}: {err}"))
    } else if err.is_timeout() {
        LookupError::transient(format!("timed out fetching {url}"))
    } else {
        LookupError::transient(format!("failed to fetch {url}: {err}"))
    }
}

fn parse_retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_user_agents_fall_back_to_defaults() {
        let settings = LookupSettings {
            user_agents: vec!["  ".to_string()],
            ..Default::default()
        };
        let client = HttpPeopleSearch::new(&settings).expect("client");
        assert_eq!(client.current_user_agent(), DEFAULT_USER_AGENTS[0]);
    }

    #[test]
    fn rotation_cycles_through_agents() {
        let settings = LookupSettings {
            user_agents: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let mut client = HttpPeopleSearch::new(&settings).expect("client");
        client.rotate_user_agent();
        assert_eq!(client.current_user_agent(), "b");
        client.rotate_user_agent();
        assert_eq!(client.current_user_agent(), "a");
    }

    #[test]
    fn bad_base_url_is_permanent() {
        let settings = LookupSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        let err = HttpPeopleSearch::new(&settings).err().expect("error");
        assert!(!err.is_retryable());
    }
}
