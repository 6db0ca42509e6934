use std::time::Duration;

use reqwest::{Client, StatusCode};

pub const USER_AGENT: &str = concat!("courtside/", env!("CARGO_PKG_VERSION"), " (discord bot)");

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status code {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The shared outbound client. Upstream providers reject requests without a user agent.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
}

/// Fails on anything but a 2xx status.
pub fn require_success(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        status => Err(FetchError::Status(status)),
    }
}
