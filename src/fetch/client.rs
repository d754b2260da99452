//! HTTP client creation.

use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use tracing::debug;

use super::types::{ACCEPT_HTML, REQUEST_TIMEOUT, USER_AGENT};
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Builds the one client shared by every worker.
///
/// The directory pins sessions to a backend through a cookie, so the client
/// keeps a cookie store.
pub fn create_http_client() -> Result<reqwest::Client, FetchError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.8"),
    );

    let cookie_store = Jar::default();
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::default())
        .build()?;

    debug!(target: TARGET_WEB_REQUEST, "Created directory HTTP client");
    Ok(client)
}
