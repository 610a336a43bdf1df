use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Debug, Parser)]
#[command(name = "site-watcher", version, about = "Watch web pages for keywords and text on changes")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "SITE_WATCHER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log outbound messages instead of sending SMS
    #[arg(long)]
    pub dry_run: bool,

    /// Validate the config and exit
    #[arg(long, conflicts_with = "once")]
    pub check: bool,

    /// Scan every site once and exit (no startup/shutdown messages)
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["site-watcher"]).unwrap();
        assert!(!cli.dry_run && !cli.check && !cli.once);
    }

    #[test]
    fn check_and_once_conflict() {
        assert!(Cli::try_parse_from(["site-watcher", "--check", "--once"]).is_err());
    }

    #[test]
    fn flags_parse() {
        let cli =
            Cli::try_parse_from(["site-watcher", "-c", "watch.toml", "--dry-run", "--once"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("watch.toml"));
        assert!(cli.dry_run);
        assert!(cli.once);
    }
}
