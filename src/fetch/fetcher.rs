//! Retrying retrieval of directory profile pages.

use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use super::client::create_http_client;
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

/// Fetches profile pages by token, retrying transport failures.
#[derive(Clone, Debug)]
pub struct ProfileFetcher {
    client: reqwest::Client,
    base_url: String,
    attempts: usize,
    retry_delay: Duration,
}

impl ProfileFetcher {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        attempts: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            create_http_client()?,
            &config.profile_base_url,
            config.fetch_attempts,
            config.retry_delay,
        ))
    }

    /// `base_url + token`; the token is used verbatim.
    pub fn profile_url(&self, token: &str) -> String {
        format!("{}{}", self.base_url, token.trim())
    }

    /// GET `url`, returning the raw body.
    ///
    /// Only transport failures are retried. A non-success status is returned
    /// at once as `FetchError::Status`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        send_with_retry(url, self.attempts, self.retry_delay, || self.client.get(url)).await
    }
}

/// Sends the request built by `build` up to `attempts` times, sleeping
/// `retry_delay` between attempts. Reading the body is part of an attempt.
pub(crate) async fn send_with_retry<F>(
    url: &str,
    attempts: usize,
    retry_delay: Duration,
    build: F,
) -> Result<Vec<u8>, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        debug!(target: TARGET_WEB_REQUEST, "Requesting {} (attempt {}/{})", url, attempt, attempts);

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!(target: TARGET_WEB_REQUEST, "Non-success status {} from {}", status, url);
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                match response.bytes().await {
                    Ok(body) => {
                        if attempt > 1 {
                            info!(target: TARGET_WEB_REQUEST, "Fetched {} after {} attempts", url, attempt);
                        }
                        return Ok(body.to_vec());
                    }
                    Err(err) => {
                        warn!(target: TARGET_WEB_REQUEST, "Failed to read body from {}: {}", url, err);
                        last_error = err.to_string();
                    }
                }
            }
            Err(err) => {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} failed: {}", url, err);
                last_error = err.to_string();
            }
        }

        if attempt < attempts {
            sleep(retry_delay).await;
        }
    }

    Err(FetchError::Exhausted {
        url: url.to_string(),
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base_url: &str) -> ProfileFetcher {
        ProfileFetcher::new(
            create_http_client().unwrap(),
            base_url,
            3,
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_profile_url() {
        let f = fetcher("https://directory.example.gov/faadir.nsf/");
        assert_eq!(
            f.profile_url(" (LoadPerson)?OpenAgent&C209 "),
            "https://directory.example.gov/faadir.nsf/(LoadPerson)?OpenAgent&C209"
        );
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let f = fetcher(&format!("{}/profile/", server.uri()));
        let body = f.fetch(&f.profile_url("abc")).await.unwrap();
        assert_eq!(body, b"<html>ok</html>".to_vec());
    }

    #[tokio::test]
    async fn test_status_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let f = fetcher(&format!("{}/", server.uri()));
        match f.fetch(&f.profile_url("missing")).await {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_exhausts_attempts() {
        // Grab a port that nothing listens on any more.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let f = fetcher(&format!("{}/", uri));
        match f.fetch(&f.profile_url("gone")).await {
            Err(FetchError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhausted retries, got {:?}", other),
        }
    }
}
