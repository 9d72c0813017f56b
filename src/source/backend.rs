//! REST backend client.
//!
//! Fetches the per-user sales report and the monthly targets for a
//! period. Authentication is an explicit [`Session`] value rather than
//! ambient browser state.

use crate::models::Period;
use crate::source::SourceError;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub const USERS_ENDPOINT: &str = "/api/user-stock-movement";
pub const TARGETS_ENDPOINT: &str = "/targets";

/// Credentials attached to every backend request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// HTTP client bound to one backend base URL.
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
    session: Session,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_seconds: u64, session: Session) -> Result<Self, SourceError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|source| SourceError::Http {
                url: base_url.clone(),
                source,
            })?;

        info!(
            "Backend client for {} (authenticated: {})",
            base_url,
            session.is_authenticated()
        );

        Ok(Self {
            http_client,
            base_url,
            timeout_seconds,
            session,
        })
    }

    /// URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/user-stock-movement?year=&month=`
    pub async fn fetch_users(&self, period: Period) -> Result<Value, SourceError> {
        self.get_json(USERS_ENDPOINT, period).await
    }

    /// `GET /targets?year=&month=`
    pub async fn fetch_targets(&self, period: Period) -> Result<Value, SourceError> {
        self.get_json(TARGETS_ENDPOINT, period).await
    }

    async fn get_json(&self, path: &str, period: Period) -> Result<Value, SourceError> {
        let url = self.endpoint(path);
        debug!("GET {} for {}", url, period);

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("year", period.year.to_string()), ("month", period.month.to_string())]);
        if let Some(ref token) = self.session.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout {
                    url: url.clone(),
                    seconds: self.timeout_seconds,
                }
            } else if e.is_connect() {
                SourceError::Connect { url: url.clone() }
            } else {
                SourceError::Http {
                    url: url.clone(),
                    source: e,
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { url, status, body });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| SourceError::Json { origin: url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ignores_blank_token() {
        assert!(!Session::new(Some("  ".to_string())).is_authenticated());
        assert!(!Session::new(None).is_authenticated());
        assert!(Session::new(Some("abc".to_string())).is_authenticated());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = BackendClient::new("https://pos.example.com/", 30, Session::default()).unwrap();

        assert_eq!(client.base_url, "https://pos.example.com");
        assert_eq!(
            client.endpoint(USERS_ENDPOINT),
            "https://pos.example.com/api/user-stock-movement"
        );
    }
}
