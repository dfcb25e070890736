use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tripgate::config::ServiceConfig;
use tripgate::http::HttpServer;
use tripgate::ratelimit::{PolicyTable, RateLimiter, Reclaimer, RulesConfig};

/// Per-client request rate limiting service.
#[derive(Debug, Parser)]
#[command(name = "tripgate", version, about)]
struct Args {
    /// Service configuration file (YAML or TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Per-route rules file, overrides `rate_limiting.rules_path`
    #[arg(short, long)]
    rules: Option<String>,

    /// HTTP listen address, overrides `server.http_addr`
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!("Starting Tripgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if let Some(rules) = args.rules {
        config.rate_limiting.rules_path = Some(rules);
    }
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    let default_policy = config.rate_limiting.default_policy();
    let rules = match &config.rate_limiting.rules_path {
        Some(path) => RulesConfig::from_file(path)?.with_builtin_routes(),
        None => RulesConfig::builtin(),
    };
    let policies = Arc::new(PolicyTable::new(rules, default_policy));

    // Initialize the rate limiter
    let rate_limiter = Arc::new(RateLimiter::with_policy(default_policy));
    info!(
        interval_ms = default_policy.interval_ms(),
        max_requests = default_policy.max_requests,
        "Rate limiter initialized"
    );

    let reclaimer = Reclaimer::spawn(
        rate_limiter.clone(),
        config.rate_limiting.reclaim_interval(),
    );

    let reload_task = match (
        &config.rate_limiting.rules_path,
        config.rate_limiting.rules_reload_interval(),
    ) {
        (Some(path), Some(period)) => {
            Some(spawn_rules_reload(policies.clone(), path.clone(), period))
        }
        _ => None,
    };

    let http_server = HttpServer::new(config.server.http_addr, rate_limiter, policies);

    // Run the server with graceful shutdown on Ctrl+C
    let served = http_server.serve_with_shutdown(shutdown_signal()).await;

    if let Some(task) = reload_task {
        task.abort();
    }
    reclaimer.shutdown().await;

    served?;
    info!("Tripgate Rate Limiting Service stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Periodically re-read the rules file into the shared policy table.
fn spawn_rules_reload(
    policies: Arc<PolicyTable>,
    path: String,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(path = %path, period_secs = period.as_secs(), "Watching rate limit rules");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately and the rules were just loaded
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = policies.reload_from(&path) {
                warn!(path = %path, error = %e, "Failed to reload rules, keeping previous rules");
            }
        }
    })
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
