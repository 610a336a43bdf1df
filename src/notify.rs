//! Outbound notifications.
//!
//! [`AlertDispatcher`] formats the four message kinds and hands them to an
//! [`OutboundChannel`]. Delivery failures stop here: they are logged and
//! reported back as [`Delivery::Failed`], never as an error.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::TwilioCredentials;
use crate::error::{ConfigError, DeliveryError};
use crate::stats::StatsSnapshot;
use crate::types::SiteDescriptor;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[async_trait]
pub trait OutboundChannel: Send + Sync {
    async fn send(&self, body: &str) -> Result<(), DeliveryError>;
}

/* ------------------------ channels ------------------------ */

/// SMS through the Twilio Messages API.
#[derive(Clone)]
pub struct TwilioChannel {
    http: Client,
    api_base: String,
    creds: TwilioCredentials,
}

impl TwilioChannel {
    pub fn new(creds: TwilioCredentials) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            http,
            api_base: TWILIO_API_BASE.to_string(),
            creds,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.creds.account_sid
        )
    }
}

#[async_trait]
impl OutboundChannel for TwilioChannel {
    async fn send(&self, body: &str) -> Result<(), DeliveryError> {
        let form = [
            ("From", self.creds.from_phone.as_str()),
            ("To", self.creds.to_phone.as_str()),
            ("Body", body),
        ];
        let res = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.creds.account_sid, Some(&self.creds.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let text = res.text().await.unwrap_or_default();
        Err(delivery_error(status, &text))
    }
}

fn delivery_error(status: StatusCode, body: &str) -> DeliveryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DeliveryError::Authentication(status.as_u16())
        }
        StatusCode::TOO_MANY_REQUESTS => DeliveryError::RateLimited,
        _ => {
            // Twilio errors are JSON with a "message" field
            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
                .unwrap_or_else(|| body.trim().to_string());
            DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Writes messages to the log instead of sending them (dry runs).
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl OutboundChannel for LogChannel {
    async fn send(&self, body: &str) -> Result<(), DeliveryError> {
        info!(target: "site_watcher::outbound", "\n{body}");
        Ok(())
    }
}

/* ------------------------ dispatcher ------------------------ */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed,
}

#[derive(Clone)]
pub struct AlertDispatcher {
    channel: Arc<dyn OutboundChannel>,
}

impl AlertDispatcher {
    pub fn new(channel: Arc<dyn OutboundChannel>) -> Self {
        Self { channel }
    }

    pub async fn send_keyword_alert(&self, url: &str, matched: &[String]) -> Delivery {
        let msg = keyword_alert_message(url, matched);
        match self.channel.send(&msg).await {
            Ok(()) => {
                info!(url, keywords = %matched.join(", "), "alert sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(error = %e, url, "failed to send keyword alert");
                Delivery::Failed
            }
        }
    }

    pub async fn send_health_check(&self, stats: &StatsSnapshot, site_count: usize) -> Delivery {
        let msg = health_check_message(stats, site_count, Local::now());
        self.deliver("health check", &msg).await
    }

    pub async fn send_startup(
        &self,
        sites: &[SiteDescriptor],
        morning: &str,
        evening: &str,
    ) -> Delivery {
        let msg = startup_message(sites, morning, evening, Local::now());
        self.deliver("startup message", &msg).await
    }

    pub async fn send_shutdown(&self, stats: &StatsSnapshot) -> Delivery {
        let msg = shutdown_message(stats, Local::now());
        self.deliver("shutdown message", &msg).await
    }

    async fn deliver(&self, what: &str, msg: &str) -> Delivery {
        match self.channel.send(msg).await {
            Ok(()) => {
                info!("{what} sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(error = %e, "failed to send {what}");
                Delivery::Failed
            }
        }
    }
}

/* ------------------------ message bodies ------------------------ */

pub fn keyword_alert_message(url: &str, matched: &[String]) -> String {
    format!("🔔 Keyword match found on {url}\nKeywords: {}", matched.join(", "))
}

pub fn health_check_message(
    stats: &StatsSnapshot,
    site_count: usize,
    now: DateTime<Local>,
) -> String {
    format!(
        "🏥 Health Check Report\n\n\
         ✅ Status: Running\n\
         ⏱️ Uptime: {:.1} hours\n\
         📊 Total Scans: {}\n\
         🔔 Total Matches: {}\n\
         📈 Sites Monitored: {}\n\n\
         Report generated: {}",
        stats.uptime_hours(),
        stats.total_scans,
        stats.total_matches,
        site_count,
        now.format(STAMP_FORMAT),
    )
}

pub fn startup_message(
    sites: &[SiteDescriptor],
    morning: &str,
    evening: &str,
    now: DateTime<Local>,
) -> String {
    let site_lines = sites
        .iter()
        .map(|s| format!("  • {}", s.url))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🚀 Site Watcher Started\n\n\
         ✅ Monitoring {} site(s)\n\
         📅 Started: {}\n\n\
         Sites:\n{}\n\n\
         Health reports scheduled for {} & {} daily",
        sites.len(),
        now.format(STAMP_FORMAT),
        site_lines,
        morning,
        evening,
    )
}

pub fn shutdown_message(stats: &StatsSnapshot, now: DateTime<Local>) -> String {
    format!(
        "🛑 Site Watcher Stopped\n\n\
         ⏱️ Final Uptime: {:.1} hours\n\
         📊 Total Scans (session): {}\n\
         🔔 Total Matches (session): {}\n\
         🕐 Stopped: {}",
        stats.uptime_hours(),
        stats.total_scans,
        stats.total_matches,
        now.format(STAMP_FORMAT),
    )
}
