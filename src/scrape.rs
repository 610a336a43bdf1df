use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::Html;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, FetchError};

pub const DEFAULT_USER_AGENT: &str = concat!("site-watcher/", env!("CARGO_PKG_VERSION"));

/// Elements whose text never reaches the page text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Fetches a page and returns its normalized (lowercase, plain) text.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct ScrapeClient {
    http: Client,
}

impl ScrapeClient {
    pub fn new(user_agent: &str) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(Policy::limited(8))
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { http })
    }

    /// GET `url` and return the decoded body. Non-2xx is an error.
    pub async fn fetch_html(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let res = self
            .http
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.text().await.map_err(|e| classify(e, timeout))?;
        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "fetched page");
        Ok(body)
    }
}

#[async_trait]
impl ContentFetcher for ScrapeClient {
    async fn fetch(&self, url_raw: &str, timeout: Duration) -> Result<String, FetchError> {
        let url = parse_http_url(url_raw)?;
        let html = self.fetch_html(&url, timeout).await?;
        Ok(html_to_text(&html))
    }
}

fn parse_http_url(url_raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(url_raw).map_err(|e| FetchError::Transport(format!("bad url: {e}")))?;
    if !(url.scheme() == "https" || url.scheme() == "http") {
        return Err(FetchError::Transport(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn classify(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if err.is_connect() {
        FetchError::Connection(err.to_string())
    } else if let Some(status) = err.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Visible text of an HTML document, lowercased, whitespace collapsed.
///
/// Text nodes are joined as-is in document order (no separator), so inline
/// markup such as `<b>now</b> hiring` reads as "now hiring".
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut raw = String::with_capacity(html.len() / 2);
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    collapse_whitespace(&raw).to_lowercase()
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
