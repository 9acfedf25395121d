use serde::{Deserialize, Serialize};

/// Configuration for [crate::ApiClient]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative request paths are resolved against
    pub base_url: String,

    /// Path of the token refresh endpoint
    pub refresh_path: String,

    /// Optional timeout for requests in seconds (ignored in the browser)
    pub timeout_seconds: Option<u64>,

    /// Scheme placed before the token in the `Authorization` header
    pub authorization_scheme: String,

    /// Response statuses that mean the access token is expired or invalid
    pub refresh_statuses: Vec<u16>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            timeout_seconds: Some(30),
            authorization_scheme: "Bearer".to_string(),
            refresh_statuses: vec![401],
        }
    }
}

impl ClientConfig {
    /// True when `status` signals an expired or invalid access token
    pub fn is_authorization_status(&self, status: reqwest::StatusCode) -> bool {
        self.refresh_statuses.contains(&status.as_u16())
    }

    /// True when `path` addresses the refresh endpoint, with or without a
    /// query string, trailing slash or origin in front of it
    pub fn is_refresh_path(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        let refresh = self.refresh_path.trim_end_matches('/');
        !refresh.is_empty() && path.ends_with(refresh)
    }
}
