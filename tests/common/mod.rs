#![allow(dead_code)]

use async_trait::async_trait;
use site_watcher::error::{DeliveryError, FetchError};
use site_watcher::notify::OutboundChannel;
use site_watcher::scrape::ContentFetcher;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns queued responses in order, one per fetch.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    requests: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn push_error(&self, err: FetchError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<(String, Duration)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push((url.to_string(), timeout));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted response".into())))
    }
}

/// Keeps every message body; can be switched to fail all sends.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<String>>,
    attempts: Mutex<usize>,
    failing: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let channel = Self::default();
        channel.set_failing(true);
        channel
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.starts_with("🔔 Keyword match"))
            .collect()
    }
}

#[async_trait]
impl OutboundChannel for RecordingChannel {
    async fn send(&self, body: &str) -> Result<(), DeliveryError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Network("channel down".into()));
        }
        self.sent.lock().unwrap().push(body.to_string());
        Ok(())
    }
}
