//! Keyword watcher for web pages.
//!
//! Each configured site is fetched on its own interval, reduced to lowercase
//! text and checked for keywords. A page that matches and whose text differs
//! from the last alerted version produces an SMS. Twice a day a health report
//! summarises scans and matches since the previous report.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod matcher;
pub mod notify;
pub mod scanner;
pub mod schedule;
pub mod scrape;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::WatcherConfig;
pub use error::{ConfigError, DeliveryError, FetchError};
pub use scanner::{ScanOutcome, Scanner};
pub use types::SiteDescriptor;
