// # nddnsd - Netlify DDNS Daemon
//
// A thin integration layer: all reconciliation logic lives in nddns-core.
//
// The daemon is responsible for:
// 1. Reading configuration from flags (with environment fallbacks)
// 2. Initializing logging and the runtime
// 3. Building the IP source and the Netlify provider
// 4. Running the Reconciler until SIGTERM/SIGINT
//
// ## Configuration
//
// | Flag                 | Environment              | Default               |
// |----------------------|--------------------------|-----------------------|
// | `--pat`              | `NDDNS_PAT`              | required              |
// | `--domain`           | `NDDNS_DOMAIN`           | required              |
// | `--subdomain`        | `NDDNS_SUBDOMAIN`        | none                  |
// | `--ttl`              | `NDDNS_TTL`              | 300                   |
// | `--poll`             | `NDDNS_POLL`             | 30m                   |
// | `--ip-url`           | `NDDNS_IP_URL`           | https://icanhazip.com |
// | `--max-retries`      | `NDDNS_MAX_RETRIES`      | 2                     |
// | `--retry-delay`      | `NDDNS_RETRY_DELAY`      | 5s                    |
// | `--replace-strategy` | `NDDNS_REPLACE_STRATEGY` | delete-then-create    |
// | `--dry-run`          | `NDDNS_DRY_RUN`          | false                 |
// | `--log-level`        | `NDDNS_LOG_LEVEL`        | info                  |
//
// ## Example
//
// ```bash
// export NDDNS_PAT=your_token
// nddnsd --domain example.com --subdomain home --poll 10m
// ```

use anyhow::{Context, Result};
use clap::Parser;
use nddns_core::config::{DdnsConfig, EngineConfig, ReplaceStrategy, parse_duration};
use nddns_core::{EngineEvent, Reconciler};
use nddns_ip_http::HttpIpSource;
use nddns_provider_netlify::NetlifyProvider;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "nddnsd")]
#[command(about = "Keeps a Netlify DNS A record pointed at this host's public IPv4 address", long_about = None)]
#[command(version)]
struct Cli {
    /// Netlify personal access token
    #[arg(long, env = "NDDNS_PAT", hide_env_values = true)]
    pat: String,

    /// Netlify-managed domain (e.g. example.com)
    #[arg(long, env = "NDDNS_DOMAIN")]
    domain: String,

    /// Label prepended to the domain (e.g. home)
    #[arg(long, env = "NDDNS_SUBDOMAIN")]
    subdomain: Option<String>,

    /// Record ttl in seconds
    #[arg(long, env = "NDDNS_TTL", default_value_t = nddns_core::config::DEFAULT_TTL)]
    ttl: u32,

    /// Time between passes (e.g. 90s, 30m, 1h30m)
    #[arg(long, env = "NDDNS_POLL", default_value = "30m", value_parser = parse_duration)]
    poll: Duration,

    /// Address-echo service URL
    #[arg(long, env = "NDDNS_IP_URL", default_value = nddns_core::config::DEFAULT_IP_URL)]
    ip_url: String,

    /// Extra attempts for read-only steps that fail with a transport error
    #[arg(long, env = "NDDNS_MAX_RETRIES", default_value_t = 2)]
    max_retries: usize,

    /// Delay between those attempts
    #[arg(long, env = "NDDNS_RETRY_DELAY", default_value = "5s", value_parser = parse_duration)]
    retry_delay: Duration,

    /// How a stale record is replaced (delete-then-create, create-then-delete)
    #[arg(long, env = "NDDNS_REPLACE_STRATEGY", default_value = "delete-then-create")]
    replace_strategy: ReplaceStrategy,

    /// Perform reads for real but only log mutations
    #[arg(long, env = "NDDNS_DRY_RUN")]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NDDNS_LOG_LEVEL", default_value = "info", value_parser = parse_log_level)]
    log_level: Level,
}

impl Cli {
    /// Build and validate the core configuration
    fn to_config(&self) -> nddns_core::Result<DdnsConfig> {
        let config = DdnsConfig::new(self.pat.clone(), self.domain.clone())
            .with_subdomain(self.subdomain.clone().unwrap_or_default())
            .with_ttl(self.ttl)
            .with_poll_interval(self.poll)
            .with_ip_url(self.ip_url.clone())
            .with_dry_run(self.dry_run)
            .with_engine(EngineConfig {
                max_retries: self.max_retries,
                retry_delay: self.retry_delay,
                replace_strategy: self.replace_strategy,
                ..EngineConfig::default()
            });
        config.validate()?;
        Ok(config)
    }
}

fn parse_log_level(level: &str) -> std::result::Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "'{}' is not valid. Valid levels: trace, debug, info, warn, error",
            level
        )),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                DdnsExitCode::ConfigError.into()
            } else {
                // --help / --version
                DdnsExitCode::CleanShutdown.into()
            };
        }
    };

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting nddnsd daemon");
    info!("Managing A record for {} (ttl {})", config.hostname(), config.ttl);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let reconciler = match build_reconciler(config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(reconciler).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the collaborators and the reconciler
fn build_reconciler(config: DdnsConfig) -> Result<(Reconciler, mpsc::Receiver<EngineEvent>)> {
    let ip_source =
        HttpIpSource::new(config.ip_url.clone()).context("Failed to build IP source")?;
    let provider = NetlifyProvider::new(config.credential.clone(), config.dry_run)
        .context("Failed to build Netlify provider")?;

    info!("Resolving public IPv4 via {}", ip_source.url());
    if provider.is_dry_run() {
        warn!("Dry-run mode: DNS records will not be modified");
    }

    Reconciler::new(Box::new(ip_source), Box::new(provider), config)
        .context("Failed to build reconciler")
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(
    (reconciler, mut event_rx): (Reconciler, mpsc::Receiver<EngineEvent>),
) -> Result<()> {
    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "engine event");
        }
    });

    let config = reconciler.config();
    info!(
        "Reconciling {} every {:?} (strategy: {}, retries: {})",
        reconciler.hostname(),
        config.poll_interval,
        config.engine.replace_strategy,
        config.engine.max_retries
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown signal error: {:#}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let result = reconciler.run_with_shutdown(Some(shutdown_rx)).await;

    signals.abort();
    // Closes the event channel so the logger task ends
    drop(reconciler);
    let _ = events.await;

    info!("Shutting down daemon");
    result.context("Reconciliation loop failed")
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
