use std::env;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use lemmatch_reference::{LoadMode, ReferenceSet};
use lemmatch_service::handlers::{
    DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_PAGE_SIZE, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL,
};
use lemmatch_service::rate_limit::{DEFAULT_RATE_LIMIT_BURST, DEFAULT_RATE_LIMIT_RPS};
use lemmatch_service::{AppState, DEFAULT_BATCH_SIZE, RateLimiterLayer, TokenBuckets, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!(
        "batch size {}, max page size {}, body limit {} bytes",
        config.batch_size, config.max_page_size, config.max_body_bytes
    );
    info!(
        "at most {} sessions, idle timeout {} s",
        config.max_sessions,
        config.session_ttl.as_secs()
    );
    info!(
        "rate limit: {} req/s (burst {})",
        config.rate_limit_rps, config.rate_limit_burst
    );

    let reference = match &config.reference_path {
        Some(path) => {
            info!(
                "preloading reference from {} (mode: {:?})",
                path.display(),
                config.reference_mode
            );
            let start = Instant::now();
            let set = ReferenceSet::from_path(path, config.reference_mode)
                .with_context(|| format!("loading reference data from {}", path.display()))?;
            info!("reference indexed in {} ms", start.elapsed().as_millis());
            Some(Arc::new(set))
        }
        None => {
            info!("no reference preloaded; sessions start empty");
            None
        }
    };

    let state = AppState {
        batch_size: config.batch_size,
        max_page_size: config.max_page_size,
        max_body_bytes: config.max_body_bytes,
        max_sessions: config.max_sessions,
        session_ttl: config.session_ttl,
        reference,
        ..AppState::default()
    };

    let rate_limiter = RateLimiterLayer::new(config.rate_limit_rps, config.rate_limit_burst);
    spawn_sweeper(state.clone(), rate_limiter.buckets());
    let app = router(state)
        .layer(rate_limiter)
        .layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drop idle sessions and refilled rate-limit buckets.
fn spawn_sweeper(state: AppState, buckets: TokenBuckets) {
    let period = (state.session_ttl / 4).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;
            let now = Instant::now();
            state.evict_idle(now);
            buckets.prune(now);
        }
    });
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    batch_size: NonZeroUsize,
    max_page_size: usize,
    max_body_bytes: usize,
    max_sessions: usize,
    session_ttl: Duration,
    rate_limit_rps: u32,
    rate_limit_burst: u32,
    reference_path: Option<PathBuf>,
    reference_mode: LoadMode,
}

fn load_config() -> Config {
    let mut cli_reference: Option<PathBuf> = None;
    let mut cli_mode: Option<LoadMode> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--reference" => {
                if let Some(path) = args.next() {
                    cli_reference = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--reference=") {
                    cli_reference = Some(PathBuf::from(path));
                } else if let Some(mode) = arg.strip_prefix("--mode=") {
                    cli_mode = LoadMode::parse(mode);
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let batch_size = env::var("BATCH_SIZE")
        .ok()
        .and_then(|v| v.parse::<NonZeroUsize>().ok())
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let max_page_size = env::var("MAX_PAGE_SIZE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_PAGE_SIZE);
    let max_body_bytes = env::var("MAX_BODY_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_BODY_BYTES);
    let max_sessions = env::var("MAX_SESSIONS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_SESSIONS);
    let session_ttl = env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SESSION_TTL);
    let rate_limit_rps = env::var("RATE_LIMIT_RPS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_RPS);
    let rate_limit_burst = env::var("RATE_LIMIT_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_BURST);
    let reference_path = cli_reference
        .or_else(|| env::var("REFERENCE_PATH").ok().map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty());
    let reference_mode = cli_mode
        .or_else(|| {
            env::var("REFERENCE_LOAD_MODE")
                .ok()
                .as_deref()
                .and_then(LoadMode::parse)
        })
        .unwrap_or_default();

    Config {
        host,
        port,
        batch_size,
        max_page_size,
        max_body_bytes,
        max_sessions,
        session_ttl,
        rate_limit_rps,
        rate_limit_burst,
        reference_path,
        reference_mode,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
