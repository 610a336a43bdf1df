use chrono::{DateTime, Local};
use std::time::Duration;

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total_scans: u64,
    pub total_matches: u64,
    pub uptime: Duration,
    pub last_reset: DateTime<Local>,
}

impl StatsSnapshot {
    pub fn uptime_hours(&self) -> f64 {
        self.uptime.as_secs_f64() / 3600.0
    }
}

/// Scan/match counters since the last health report.
#[derive(Debug, Clone)]
pub struct StatsTracker {
    total_scans: u64,
    total_matches: u64,
    last_reset: DateTime<Local>,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::starting_at(Local::now())
    }

    pub fn starting_at(last_reset: DateTime<Local>) -> Self {
        Self {
            total_scans: 0,
            total_matches: 0,
            last_reset,
        }
    }

    pub fn record_scan(&mut self) {
        self.total_scans += 1;
    }

    pub fn record_match(&mut self) {
        self.total_matches += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Local::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Local>) -> StatsSnapshot {
        StatsSnapshot {
            total_scans: self.total_scans,
            total_matches: self.total_matches,
            uptime: (now - self.last_reset).to_std().unwrap_or_default(),
            last_reset: self.last_reset,
        }
    }

    pub fn reset(&mut self) {
        self.reset_at(Local::now());
    }

    pub fn reset_at(&mut self, now: DateTime<Local>) {
        self.total_scans = 0;
        self.total_matches = 0;
        self.last_reset = now;
    }

    pub fn total_scans(&self) -> u64 {
        self.total_scans
    }

    pub fn total_matches(&self) -> u64 {
        self.total_matches
    }
}
