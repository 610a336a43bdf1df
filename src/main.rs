use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use site_watcher::app;
use site_watcher::cli::Cli;
use site_watcher::config::{TwilioCredentials, WatcherConfig};
use site_watcher::notify::{LogChannel, OutboundChannel, TwilioChannel};
use site_watcher::scrape::ScrapeClient;
use site_watcher::telemetry::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config first: the log file name lives in it.
    let config = match WatcherConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            let _guard = init_tracing("info", None);
            error!(error = %e, path = %cli.config.display(), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let log_file = Path::new(&config.settings.log_file_name);
    let _guard = init_tracing(&config.settings.log_level, Some(log_file));
    info!(
        sites = config.sites.len(),
        path = %cli.config.display(),
        "loaded config"
    );

    if cli.check {
        for site in &config.sites {
            println!(
                "{}\t{}\tevery {}h\t{}",
                site.name,
                site.url,
                site.interval_hours,
                site.keywords.join(", ")
            );
        }
        return ExitCode::SUCCESS;
    }

    match start(&cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = format!("{e:#}"), "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: &Cli, config: &WatcherConfig) -> anyhow::Result<ExitCode> {
    let fetcher =
        Arc::new(ScrapeClient::new(&config.settings.user_agent).context("building http client")?);

    let channel: Arc<dyn OutboundChannel> = if cli.dry_run {
        info!("dry run: outbound messages go to the log");
        Arc::new(LogChannel)
    } else {
        let creds = TwilioCredentials::from_env().context("reading twilio credentials")?;
        info!(from = %creds.from_phone, to = %creds.to_phone, "twilio channel ready");
        Arc::new(TwilioChannel::new(creds).context("building twilio channel")?)
    };

    if cli.once {
        let snapshot = app::scan_once(config, fetcher, channel).await;
        info!(
            scans = snapshot.total_scans,
            matches = snapshot.total_matches,
            "single pass finished"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let code = app::run(config, fetcher, channel).await?;
    Ok(code)
}
