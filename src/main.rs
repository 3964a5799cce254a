//! cdnpulse - ChinaCache CDN statistics exporter
//!
//! Polls hit rate, ISP, region and status-code statistics for every configured
//! channel and pushes one snapshot per cycle to a Prometheus Pushgateway.

use anyhow::{bail, Context, Result};
use cdnpulse_collector::{CycleReport, SnapshotEmitter};
use cdnpulse_core::{AppConfig, ChannelId, MetricSink, RawSettings, TranslationTable};
use cdnpulse_data::{ChinaCacheClient, ChinaCacheConfig};
use cdnpulse_observability::{
    init_logging, record_cycle, register_metrics, LogFormat, LogSink, PushGatewaySink,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};

/// Command line arguments; every setting falls back to its environment variable
#[derive(Debug, Parser)]
#[command(name = "cdnpulse", version, about)]
struct Args {
    /// Pushgateway base URL
    #[arg(long, env = "PUSHGATEWAY")]
    pushgateway: Option<String>,

    /// ChinaCache API user
    #[arg(long, env = "CHINACACHE_USER")]
    user: Option<String>,

    /// ChinaCache API password
    #[arg(long, env = "CHINACACHE_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Comma-delimited channel ids
    #[arg(long, env = "CHINACACHE_CHANNEL_IDS")]
    channel_ids: Option<String>,

    /// Poll interval, e.g. "5m"; absent or zero runs a single cycle
    #[arg(long, env = "CHINACACHE_INTERVAL")]
    interval: Option<String>,

    /// Query window in minutes
    #[arg(long, env = "QUERYTIME")]
    query_time: Option<String>,

    /// TOML file with additional label translations
    #[arg(long, env = "CHINACACHE_TRANSLATIONS")]
    translations: Option<PathBuf>,

    /// ChinaCache portal API base URL
    #[arg(long, env = "CHINACACHE_API_BASE")]
    api_base: Option<String>,

    /// Pushgateway job name
    #[arg(long, env = "PUSH_JOB")]
    job: Option<String>,

    /// Log snapshots instead of pushing them
    #[arg(long)]
    dry_run: bool,

    /// Log format: pretty, json or compact
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Default log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

impl From<Args> for RawSettings {
    fn from(args: Args) -> Self {
        Self {
            pushgateway: args.pushgateway,
            user: args.user,
            pass: args.pass,
            channel_ids: args.channel_ids,
            interval: args.interval,
            query_time: args.query_time,
            translations: args.translations,
            api_base: args.api_base,
            job: args.job,
            dry_run: args.dry_run,
        }
    }
}

/// Main application state
struct App {
    emitter: SnapshotEmitter,
    channels: Vec<ChannelId>,
    interval: Option<std::time::Duration>,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let translations = Self::load_translations(&config)?;

        let client = ChinaCacheClient::new(ChinaCacheConfig::new(
            config.api_base.clone(),
            config.credentials.user.clone(),
            config.credentials.pass.clone(),
        ))
        .context("Failed to create ChinaCache client")?;

        let sink: Arc<dyn MetricSink> = match (&config.push.gateway, config.dry_run) {
            (Some(gateway), false) => Arc::new(
                PushGatewaySink::new(gateway, &config.push.job)
                    .context("Failed to create Pushgateway sink")?,
            ),
            _ => Arc::new(LogSink::new()),
        };

        info!(
            channels = config.channels.len(),
            query_minutes = config.query_duration.as_secs() / 60,
            interval = ?config.interval,
            sink = sink.name(),
            job = %config.push.job,
            "cdnpulse configured"
        );

        Ok(Self {
            emitter: SnapshotEmitter::new(
                Arc::new(client),
                Arc::new(translations),
                sink,
                config.query_duration,
            ),
            channels: config.channels,
            interval: config.interval,
        })
    }

    fn load_translations(config: &AppConfig) -> Result<TranslationTable> {
        let table = TranslationTable::builtin();
        match &config.translations {
            Some(path) => table
                .load_overrides(path)
                .with_context(|| format!("Failed to load translations: {}", path.display())),
            None => Ok(table),
        }
    }

    async fn cycle(&self) -> CycleReport {
        let report = self.emitter.collect_all(&self.channels).await;
        record_cycle(&report);
        report
    }

    /// Run one cycle, or keep cycling until Ctrl+C.
    ///
    /// Fails when the last snapshot could not be published.
    async fn run(&self) -> Result<()> {
        let mut last = self.cycle().await;

        if let Some(interval) = self.interval {
            info!(interval = ?interval, "Polling until shutdown");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        last = self.cycle().await;
                    }
                }
            }
        }

        if let Some(e) = last.publish_error {
            error!(error = %e, "Last snapshot was not published");
            bail!("Last snapshot was not published: {}", e);
        }
        if !last.failures.is_empty() {
            warn!(
                failures = last.failures.len(),
                "Last snapshot was published with missing categories"
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);
    register_metrics();

    let config = AppConfig::from_raw(args.into()).context("Invalid configuration")?;
    let app = App::new(config)?;
    app.run().await
}
