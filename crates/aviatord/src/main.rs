// # aviatord - Observation Collector Daemon
//
// This is a thin integration layer. All cycle, extraction and delivery logic
// lives in aviator-core.
//
// The aviatord daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the HTML surface and HTTP transport into a Collector
// 4. Running the timer loop until SIGTERM or SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Surface
// - `AVIATOR_PAGE_URL`: Page to observe (required)
//
// ### Store
// - `AVIATOR_ENDPOINTS`: Comma-separated store base URLs, in priority order (required)
// - `AVIATOR_ROOT_NAMESPACE`: Root path segment (default: aviator)
// - `AVIATOR_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 10)
//
// ### Timing
// - `AVIATOR_CYCLE_INTERVAL_MS`: Timer period (default: 2500)
// - `AVIATOR_POLL_BUDGET_MS`: Extraction budget per cycle (default: 4500)
// - `AVIATOR_POLL_SLEEP_MS`: Delay between extraction attempts (default: 120)
//
// ### Logging
// - `AVIATOR_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export AVIATOR_PAGE_URL=https://game.example.com/aviator
// export AVIATOR_ENDPOINTS=https://primary.firebaseio.com,https://backup.firebaseio.com
//
// aviatord
// ```

use anyhow::{Context, Result};
use aviator_core::{Collector, CollectorConfig, CollectorEvent, SystemClock};
use aviator_store_http::HttpAppendTransport;
use aviator_surface_html::HtmlSnapshotSurface;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, debug, error, info};
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
enum AviatorExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<AviatorExitCode> for ExitCode {
    fn from(code: AviatorExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    page_url: String,
    endpoints: Vec<String>,
    root_namespace: Option<String>,
    cycle_interval_ms: Option<u64>,
    poll_budget_ms: Option<u64>,
    poll_sleep_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            page_url: lookup("AVIATOR_PAGE_URL").unwrap_or_default(),
            endpoints: lookup("AVIATOR_ENDPOINTS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            root_namespace: lookup("AVIATOR_ROOT_NAMESPACE"),
            cycle_interval_ms: parse_var(&lookup, "AVIATOR_CYCLE_INTERVAL_MS")?,
            poll_budget_ms: parse_var(&lookup, "AVIATOR_POLL_BUDGET_MS")?,
            poll_sleep_ms: parse_var(&lookup, "AVIATOR_POLL_SLEEP_MS")?,
            request_timeout_secs: parse_var(&lookup, "AVIATOR_REQUEST_TIMEOUT_SECS")?,
            log_level: lookup("AVIATOR_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the daemon-level settings
    ///
    /// Collector settings are validated again by `CollectorConfig::validate()`.
    fn validate(&self) -> Result<()> {
        if self.page_url.is_empty() {
            anyhow::bail!(
                "AVIATOR_PAGE_URL is required. \
                Set it via: export AVIATOR_PAGE_URL=https://game.example.com/aviator"
            );
        }

        if !self.page_url.starts_with("https://") && !self.page_url.starts_with("http://") {
            anyhow::bail!(
                "AVIATOR_PAGE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.page_url
            );
        }

        if self.endpoints.is_empty() {
            anyhow::bail!(
                "AVIATOR_ENDPOINTS must contain at least one endpoint. \
                Set it via: export AVIATOR_ENDPOINTS=https://primary.example,https://backup.example"
            );
        }

        if self.log_level().is_none() {
            anyhow::bail!(
                "AVIATOR_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        self.collector_config()
            .validate()
            .context("Invalid collector configuration")?;

        Ok(())
    }

    fn log_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }

    /// Collector configuration with environment overrides applied
    fn collector_config(&self) -> CollectorConfig {
        let mut config = CollectorConfig::new(self.endpoints.clone());

        if let Some(namespace) = &self.root_namespace {
            config.delivery.root_namespace = namespace.clone();
        }
        if let Some(secs) = self.request_timeout_secs {
            config.delivery.request_timeout_secs = secs;
        }
        if let Some(ms) = self.cycle_interval_ms {
            config.timing.cycle_interval_ms = ms;
        }
        if let Some(ms) = self.poll_budget_ms {
            config.timing.poll_budget_ms = ms;
        }
        if let Some(ms) = self.poll_sleep_ms {
            config.timing.poll_sleep_ms = ms;
        }

        config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number. Got: '{}'", key, value))
        })
        .transpose()
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return AviatorExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return AviatorExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AviatorExitCode::ConfigError.into();
    }

    info!("Starting aviatord daemon");
    info!(
        "Configuration loaded: {} endpoint(s)",
        config.endpoints.len()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AviatorExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => AviatorExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                AviatorExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let collector_config = config.collector_config();
    let timeout = collector_config.delivery.request_timeout();

    let surface = HtmlSnapshotSurface::from_url(config.page_url.clone(), timeout)
        .await
        .with_context(|| format!("Failed to load page {}", config.page_url))?;
    let transport = HttpAppendTransport::new(timeout)?;

    let (collector, mut events) = Collector::new(
        Arc::new(surface),
        Box::new(transport),
        Arc::new(SystemClock),
        collector_config,
    )?;

    // Drain events so the channel never fills up
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CollectorEvent::Started { endpoints_count } => {
                    debug!("Collector started with {} endpoint(s)", endpoints_count)
                }
                other => debug!("Collector event: {:?}", other),
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    Arc::new(collector)
        .run_with_shutdown(Some(shutdown_rx))
        .await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
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

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
