//! Harvesting work lines from the directory's last-name search form.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::client::create_http_client;
use super::fetcher::send_with_retry;
use super::types::{PROFILE_LINK_MARKER, SEARCH_CLICK_ID};
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::TARGET_WEB_REQUEST;

lazy_static! {
    static ref PROFILE_ANCHOR: Regex =
        Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*"([^"]*)"[^>]*>(.*?)</a>"#).unwrap();
    static ref INNER_TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
}

/// Every two-letter lowercase prefix, "aa" through "zz".
pub fn search_prefixes() -> Vec<String> {
    ('a'..='z')
        .flat_map(|first| ('a'..='z').map(move |second| format!("{}{}", first, second)))
        .collect()
}

/// Posts last-name prefix queries to the directory search form.
#[derive(Clone, Debug)]
pub struct DirectorySearch {
    client: reqwest::Client,
    search_url: String,
    save_dir: Option<PathBuf>,
    attempts: usize,
    retry_delay: Duration,
}

impl DirectorySearch {
    pub fn new(client: reqwest::Client, search_url: &str, attempts: usize, retry_delay: Duration) -> Self {
        Self {
            client,
            search_url: search_url.to_string(),
            save_dir: None,
            attempts,
            retry_delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            create_http_client()?,
            &config.search_url,
            config.fetch_attempts,
            config.retry_delay,
        )
        .with_save_dir(config.work_dir.clone()))
    }

    /// Keep a copy of every result page as `<dir>/<prefix>.html`.
    pub fn with_save_dir(mut self, dir: PathBuf) -> Self {
        self.save_dir = Some(dir);
        self
    }

    /// Fetches the result page for all last names starting with `prefix`.
    pub async fn fetch_results(&self, prefix: &str) -> Result<String, FetchError> {
        let last_name_query = format!("{}*", prefix);
        let form = [
            ("__Click", SEARCH_CLICK_ID),
            ("FAP_LastName", last_name_query.as_str()),
            ("FAP_FirstName", ""),
        ];

        debug!(target: TARGET_WEB_REQUEST, "Searching directory for prefix '{}'", prefix);
        let body = send_with_retry(&self.search_url, self.attempts, self.retry_delay, || {
            self.client.post(&self.search_url).form(&form)
        })
        .await?;
        let html = String::from_utf8_lossy(&body).into_owned();

        if let Some(dir) = &self.save_dir {
            let path = dir.join(format!("{}.html", prefix));
            if let Err(err) = tokio::fs::write(&path, &html).await {
                warn!(target: TARGET_WEB_REQUEST, "Could not save {}: {}", path.display(), err);
            }
        }

        Ok(html)
    }

    /// Fetches and parses one prefix into work lines.
    pub async fn harvest(&self, prefix: &str) -> Result<Vec<String>, FetchError> {
        let html = self.fetch_results(prefix).await?;
        let lines = extract_work_lines(&html);
        info!(target: TARGET_WEB_REQUEST, "Prefix '{}': {} profiles", prefix, lines.len());
        Ok(lines)
    }
}

/// Turns every profile link on a search result page into a work line of the
/// form `"Last, First; <token>"`.
pub fn extract_work_lines(html: &str) -> Vec<String> {
    PROFILE_ANCHOR
        .captures_iter(html)
        .filter_map(|caps| {
            let href = decode_entities(caps.get(1)?.as_str());
            let start = href.find(PROFILE_LINK_MARKER)?;
            let token = href[start..].trim().to_string();

            let text = INNER_TAG.replace_all(caps.get(2)?.as_str(), "");
            let name = decode_entities(&text)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if !name.contains(',') {
                return None;
            }
            Some(format!("{}; {}", name, token))
        })
        .collect()
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
