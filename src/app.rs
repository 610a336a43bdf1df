//! Lifecycle: wire the scanner to the schedule, announce startup, run until a
//! signal (or a crash of the loop itself), announce shutdown.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::WatcherConfig;
use crate::error::ConfigError;
use crate::notify::{AlertDispatcher, OutboundChannel};
use crate::scanner::{ScanOutcome, Scanner};
use crate::schedule::{Job, JobRunner, Scheduler, Trigger};
use crate::scrape::ContentFetcher;
use crate::shutdown::{ShutdownListener, ShutdownSignal};
use crate::stats::StatsSnapshot;
use crate::types::SiteDescriptor;

/// Upper bound on the final notification once shutdown has started.
pub const SHUTDOWN_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// The job runner: the site list plus the scanner that owns all scan state.
pub struct Watcher {
    sites: Vec<SiteDescriptor>,
    scanner: Scanner,
}

impl Watcher {
    pub fn new(sites: Vec<SiteDescriptor>, scanner: Scanner) -> Self {
        Self { sites, scanner }
    }

    pub fn sites(&self) -> &[SiteDescriptor] {
        &self.sites
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// One interval entry per site, then the two daily health checks.
    pub fn register(
        &self,
        scheduler: &mut Scheduler,
        morning: NaiveTime,
        evening: NaiveTime,
        now: DateTime<Local>,
    ) {
        for (i, site) in self.sites.iter().enumerate() {
            let entry = scheduler.add(Trigger::every_hours(site.interval_hours), Job::ScanSite(i), now);
            info!(
                site = %site.name,
                url = %site.url,
                every_hours = site.interval_hours,
                keywords = ?site.keywords,
                first_run = %entry.next_run().format("%Y-%m-%d %H:%M:%S"),
                "registered site"
            );
        }

        scheduler.add(Trigger::DailyAt(morning), Job::HealthCheck, now);
        scheduler.add(Trigger::DailyAt(evening), Job::HealthCheck, now);
        info!(
            morning = %morning.format("%H:%M"),
            evening = %evening.format("%H:%M"),
            "health checks scheduled daily"
        );
    }

    pub async fn scan_all(&mut self) -> Vec<ScanOutcome> {
        let mut outcomes = Vec::with_capacity(self.sites.len());
        for site in &self.sites {
            outcomes.push(self.scanner.scan_site(site).await);
        }
        outcomes
    }
}

#[async_trait]
impl JobRunner for Watcher {
    async fn run_job(&mut self, job: &Job) {
        let site_count = self.sites.len();
        let run = match job {
            Job::ScanSite(i) => match self.sites.get(*i) {
                Some(site) => {
                    let url = site.url.clone();
                    AssertUnwindSafe(self.scanner.scan_site(site))
                        .catch_unwind()
                        .await
                        .map(drop)
                        .map_err(|panic| (Some(url), panic))
                }
                None => {
                    warn!(index = i, "scan job refers to an unknown site");
                    Ok(())
                }
            },
            Job::HealthCheck => AssertUnwindSafe(self.scanner.health_check(site_count))
                .catch_unwind()
                .await
                .map(drop)
                .map_err(|panic| (None, panic)),
        };

        if let Err((url, panic)) = run {
            let reason = panic_message(panic.as_ref());
            match url {
                Some(url) => error!(url = %url, reason = %reason, "unexpected error while processing site"),
                None => error!(reason = %reason, "unexpected error during health check"),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

enum Stop {
    Signal(ShutdownSignal),
    Crashed(String),
}

/// Run the watcher until SIGINT/SIGTERM. Exit code 0 on a signal, 1 if the
/// scheduling loop itself died. `config` is validated first.
pub async fn run(
    config: &WatcherConfig,
    fetcher: Arc<dyn ContentFetcher>,
    channel: Arc<dyn OutboundChannel>,
) -> Result<ExitCode, ConfigError> {
    config.validate()?;
    let settings = &config.settings;
    let (morning, evening) = settings.health_check_times()?;

    // Before the startup send, which can block for the channel's timeout.
    let mut signals = ShutdownListener::install();

    let dispatcher = AlertDispatcher::new(channel);
    let scanner = Scanner::new(fetcher, dispatcher.clone(), settings.request_timeout());
    let mut watcher = Watcher::new(config.sites.clone(), scanner);

    let mut scheduler = Scheduler::new();
    watcher.register(&mut scheduler, morning, evening, Local::now());

    info!(
        sites = watcher.sites().len(),
        tick_secs = settings.loop_sleep_interval_secs,
        "site watcher running"
    );
    dispatcher
        .send_startup(
            watcher.sites(),
            &settings.health_check_morning,
            &settings.health_check_evening,
        )
        .await;

    let tick = settings.tick_interval();
    let stop = tokio::select! {
        crashed = AssertUnwindSafe(scheduler.run(&mut watcher, tick)).catch_unwind() => {
            Stop::Crashed(match crashed {
                Ok(()) => "scheduler loop exited".to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            })
        }
        signal = signals.recv() => Stop::Signal(signal),
    };

    let snapshot = watcher.scanner().stats().snapshot();
    match stop {
        Stop::Signal(signal) => {
            info!(signal = %signal, "shutting down gracefully");
            send_final(&dispatcher, &snapshot).await;
            Ok(ExitCode::SUCCESS)
        }
        Stop::Crashed(reason) => {
            error!(reason = %reason, "fatal error in scheduler loop");
            send_final(&dispatcher, &snapshot).await;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn send_final(dispatcher: &AlertDispatcher, snapshot: &StatsSnapshot) {
    if tokio::time::timeout(SHUTDOWN_SEND_TIMEOUT, dispatcher.send_shutdown(snapshot))
        .await
        .is_err()
    {
        warn!(
            timeout_secs = SHUTDOWN_SEND_TIMEOUT.as_secs(),
            "shutdown message timed out"
        );
    }
}

/// Scan every configured site once, in order. Keyword alerts still go out.
pub async fn scan_once(
    config: &WatcherConfig,
    fetcher: Arc<dyn ContentFetcher>,
    channel: Arc<dyn OutboundChannel>,
) -> StatsSnapshot {
    let scanner = Scanner::new(
        fetcher,
        AlertDispatcher::new(channel),
        config.settings.request_timeout(),
    );
    let mut watcher = Watcher::new(config.sites.clone(), scanner);
    let outcomes = watcher.scan_all().await;
    for (site, outcome) in watcher.sites().iter().zip(&outcomes) {
        info!(site = %site.name, outcome = ?outcome, "scan finished");
    }
    watcher.scanner().stats().snapshot()
}
