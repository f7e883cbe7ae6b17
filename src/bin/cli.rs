//! Notice monitor CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use notice_monitor::{
    error::{AppError, Result},
    models::{Config, SourceMode},
    notify::{self, SubscriptionClient},
    pipeline::NoticeMonitor,
    services,
    storage::{KeyValueStore, LocalStore},
};

/// MMMUT examination notice monitor
#[derive(Parser, Debug)]
#[command(
    name = "notice-monitor",
    version,
    about = "Watches the examination schedule page for new notices"
)]
struct Cli {
    /// Path to storage directory containing config and state files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the page on an interval and alert on new notices
    Watch {
        /// Poll interval in milliseconds (default: monitor.poll_interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Fetch the page directly instead of through the proxy
        #[arg(long)]
        direct: bool,
    },

    /// Poll once and print every notice
    Check {
        /// Print notices as JSON
        #[arg(long)]
        json: bool,

        /// Fetch the page directly instead of through the proxy
        #[arg(long)]
        direct: bool,
    },

    /// Subscribe an email address to notice alerts
    Subscribe {
        /// Address to subscribe
        email: String,
    },

    /// Validate configuration files
    Validate,

    /// Show stored watermark and state info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build a monitor over the local state file.
fn build_monitor(config: &Config, store: Arc<LocalStore>) -> Result<NoticeMonitor> {
    let fetcher = services::fetcher_for(config)?;
    NoticeMonitor::from_config(config, fetcher, store)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let store = Arc::new(LocalStore::new(&cli.storage_dir));

    match cli.command {
        Command::Watch {
            interval_ms,
            direct,
        } => {
            if direct {
                config.source.mode = SourceMode::Direct;
            }
            if let Some(ms) = interval_ms {
                config.monitor.poll_interval_ms = ms;
            }
            config.validate()?;

            let monitor = build_monitor(&config, store)?;
            let _subscriptions: Vec<_> = notify::observers_from_config(&config)?
                .into_iter()
                .map(|observer| monitor.subscribe(observer))
                .collect();

            let handle = monitor.start(config.monitor.poll_interval()).await;
            log::info!("Watching {} (Ctrl-C to stop)", config.source.page_url);

            tokio::signal::ctrl_c().await?;
            handle.stop().await;

            let stats = monitor.stats().await;
            log::info!(
                "Stopped after {} polls ({} fetch failures, {} notices delivered)",
                stats.polls,
                stats.fetch_failures,
                stats.notices_delivered
            );
        }

        Command::Check { json, direct } => {
            if direct {
                config.source.mode = SourceMode::Direct;
            }
            config.validate()?;

            let monitor = build_monitor(&config, store)?;
            let result = monitor.poll_now().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.notices)?);
            } else {
                print!("{}", notify::render_notices(&result.notices));
            }
            log::info!(
                "{} notices, {} new, watermark {}",
                result.notices.len(),
                result.new_notices.len(),
                monitor.watermark().await
            );
        }

        Command::Subscribe { email } => {
            let endpoint = config
                .notify
                .subscribe_url
                .as_deref()
                .ok_or_else(|| AppError::config("notify.subscribe_url is not set"))?;

            let client = SubscriptionClient::new(&config.crawler, endpoint)?;
            let reply = client.subscribe(&email).await?;
            println!("{}", reply.trim());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            services::NoticeExtractor::from_config(&config.source)?;
            log::info!("✓ Table selector OK");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Source: {} ({:?} mode)", config.source.page_url, config.source.mode);
            log::info!(
                "Poll interval: {:?}",
                Duration::from_millis(config.monitor.poll_interval_ms)
            );

            match store.get(&config.monitor.state_key)? {
                Some(value) => log::info!("Stored watermark: {}", value),
                None => log::info!(
                    "No watermark stored yet (default {})",
                    config.monitor.initial_watermark
                ),
            }
            if let Some(updated) = store.read_state()?.updated_at {
                log::info!("Last updated: {}", updated);
            }
        }
    }

    Ok(())
}
