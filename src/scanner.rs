use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::FetchError;
use crate::matcher::find_matches;
use crate::notify::{AlertDispatcher, Delivery};
use crate::scrape::ContentFetcher;
use crate::stats::StatsTracker;
use crate::store::{fingerprint, ChangeDetector};
use crate::types::SiteDescriptor;

/// How a single scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    FetchFailed(FetchError),
    NoMatch,
    Unchanged,
    Alerted { keywords: Vec<String>, delivery: Delivery },
}

/// Owns the mutable scan state: last-seen fingerprints and run counters.
pub struct Scanner {
    fetcher: Arc<dyn ContentFetcher>,
    dispatcher: AlertDispatcher,
    detector: ChangeDetector,
    stats: StatsTracker,
    request_timeout: Duration,
}

impl Scanner {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        dispatcher: AlertDispatcher,
        request_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            dispatcher,
            detector: ChangeDetector::new(),
            stats: StatsTracker::new(),
            request_timeout,
        }
    }

    /// fetch → match → change check → alert. Failures end the scan, never
    /// the caller.
    pub async fn scan_site(&mut self, site: &SiteDescriptor) -> ScanOutcome {
        info!(site = %site.name, url = %site.url, "scanning");
        self.stats.record_scan();

        let text = match self.fetcher.fetch(&site.url, self.request_timeout).await {
            Ok(text) => text,
            Err(e) => {
                log_fetch_error(&site.url, &e);
                return ScanOutcome::FetchFailed(e);
            }
        };

        let keywords = find_matches(&text, &site.keywords);
        if keywords.is_empty() {
            debug!(url = %site.url, "no keyword matches found");
            return ScanOutcome::NoMatch;
        }

        // Only pages with a match ever reach the fingerprint store.
        if !self.detector.has_changed_since(&site.url, fingerprint(&text)) {
            debug!(url = %site.url, "no new content since last check");
            return ScanOutcome::Unchanged;
        }

        self.stats.record_match();
        let delivery = self.dispatcher.send_keyword_alert(&site.url, &keywords).await;
        ScanOutcome::Alerted { keywords, delivery }
    }

    /// Report counters, then reset them whether or not the report went out.
    pub async fn health_check(&mut self, site_count: usize) -> Delivery {
        let snapshot = self.stats.snapshot();
        let delivery = self.dispatcher.send_health_check(&snapshot, site_count).await;
        self.stats.reset();
        delivery
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }
}

fn log_fetch_error(url: &str, err: &FetchError) {
    let category = err.category();
    match err {
        FetchError::Timeout(limit) => error!(
            url,
            category,
            "timeout while fetching ({}s limit exceeded)",
            limit.as_secs_f32()
        ),
        FetchError::Connection(detail) => error!(
            url,
            category,
            detail = %detail,
            "connection error while fetching (site may be down)"
        ),
        FetchError::Status(code) => error!(url, category, status = code, "http error while fetching"),
        FetchError::Transport(detail) => {
            error!(url, category, detail = %detail, "request failed")
        }
    }
}
