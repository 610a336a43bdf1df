//! Tick-driven job schedule.
//!
//! Every tick walks the entries in registration order; each entry that is
//! due runs to completion before the next one starts, then gets its next fire
//! time. A slow job therefore delays the rest of the tick, and an entry that
//! was overdue for a long time fires once, not once per missed period.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Ten years; keeps `now + period` far from chrono's range limits.
const MAX_PERIOD_HOURS: f64 = 87_600.0;
const MIN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fixed period, measured from the tick that last ran the job.
    Every(TimeDelta),
    /// Once a day at a local clock time.
    DailyAt(NaiveTime),
}

impl Trigger {
    /// Period of `hours` (fractional allowed), never shorter than a second.
    pub fn every_hours(hours: f64) -> Self {
        // NaN casts to 0 and is then raised to the one-second floor
        let millis = (hours.clamp(0.0, MAX_PERIOD_HOURS) * 3_600_000.0).round() as i64;
        Trigger::Every(TimeDelta::milliseconds(millis).max(TimeDelta::seconds(1)))
    }

    pub fn next_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        match *self {
            Trigger::Every(period) => now + period,
            Trigger::DailyAt(time) => next_daily(time, now),
        }
    }
}

/// First occurrence of `time` strictly after `now`. A clock time skipped by a
/// DST jump resolves to the next day that has it.
fn next_daily(time: NaiveTime, now: DateTime<Local>) -> DateTime<Local> {
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = Local.from_local_datetime(&date.and_time(time)).earliest() {
            if candidate > now {
                return candidate;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    now + TimeDelta::days(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Job {
    /// Index into the watcher's site list.
    ScanSite(usize),
    HealthCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Idle,
    Due,
    Running,
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub trigger: Trigger,
    pub job: Job,
    next_run: DateTime<Local>,
    state: EntryState,
}

impl ScheduleEntry {
    pub fn next_run(&self) -> DateTime<Local> {
        self.next_run
    }

    pub fn state(&self) -> EntryState {
        self.state
    }
}

#[async_trait]
pub trait JobRunner: Send {
    async fn run_job(&mut self, job: &Job);
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<ScheduleEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job`; its first run is the trigger's next fire after `now`.
    pub fn add(&mut self, trigger: Trigger, job: Job, now: DateTime<Local>) -> &ScheduleEntry {
        self.entries.push(ScheduleEntry {
            trigger,
            job,
            next_run: trigger.next_after(now),
            state: EntryState::Idle,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest upcoming fire time across all entries.
    pub fn next_run(&self) -> Option<DateTime<Local>> {
        self.entries.iter().map(|e| e.next_run).min()
    }

    /// Run every entry due at `now`, sequentially. Returns how many ran.
    pub async fn run_pending<R>(&mut self, now: DateTime<Local>, runner: &mut R) -> usize
    where
        R: JobRunner + ?Sized,
    {
        for entry in self.entries.iter_mut() {
            if entry.next_run <= now {
                entry.state = EntryState::Due;
            }
        }

        let mut ran = 0;
        for entry in self.entries.iter_mut() {
            if entry.state != EntryState::Due {
                continue;
            }
            entry.state = EntryState::Running;
            debug!(job = ?entry.job, "running job");
            runner.run_job(&entry.job).await;
            entry.next_run = entry.trigger.next_after(now);
            entry.state = EntryState::Idle;
            ran += 1;
        }
        ran
    }

    /// Tick forever: run what is due, then wait `tick` (at least a second).
    pub async fn run<R>(&mut self, runner: &mut R, tick: Duration)
    where
        R: JobRunner + ?Sized,
    {
        let mut interval = tokio::time::interval(tick.max(MIN_TICK));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.run_pending(Local::now(), runner).await;
        }
    }
}
