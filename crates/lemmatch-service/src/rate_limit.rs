//! Per-client token buckets in front of the router.
//!
//! Clients are keyed by the first address in `X-Forwarded-For`, falling back
//! to `X-Real-IP`. Requests that carry neither header are not limited. Over
//! the limit, the layer answers `429` with the API's `{ "error" }` body.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::Json;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use dashmap::DashMap;
use serde_json::json;
use tower::{Layer, Service};
use tracing::warn;

pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 40;
const LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token buckets shared by every clone of the limiter.
#[derive(Clone)]
pub struct TokenBuckets {
    buckets: Arc<DashMap<String, Bucket>>,
    rate_per_sec: f64,
    burst: f64,
    dropped_since_log: Arc<AtomicU64>,
    last_log: Arc<Mutex<Instant>>,
}

impl TokenBuckets {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            rate_per_sec: f64::from(rate_per_sec),
            burst: f64::from(burst.max(1)),
            dropped_since_log: Arc::new(AtomicU64::new(0)),
            last_log: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Refill `client`'s bucket up to `now` and take one token if there is one.
    pub fn try_acquire(&self, client: &str, now: Instant) -> bool {
        let mut entry = self
            .buckets
            .entry(client.to_string())
            .or_insert(Bucket {
                tokens: self.burst,
                last_refill: now,
            });
        let elapsed = now
            .saturating_duration_since(entry.last_refill)
            .as_secs_f64();
        if elapsed > 0.0 {
            entry.tokens = (entry.tokens + elapsed * self.rate_per_sec).min(self.burst);
            entry.last_refill = now;
        }
        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Forget clients whose bucket would be full again by `now`; returns how
    /// many were dropped.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            let elapsed = now
                .saturating_duration_since(bucket.last_refill)
                .as_secs_f64();
            bucket.tokens + elapsed * self.rate_per_sec < self.burst
        });
        before.saturating_sub(self.buckets.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn record_drop(&self) {
        self.dropped_since_log.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let Ok(mut last) = self.last_log.lock() else {
            return;
        };
        if now.saturating_duration_since(*last) >= LOG_INTERVAL {
            let dropped = self.dropped_since_log.swap(0, Ordering::Relaxed);
            if dropped > 0 {
                warn!("rate limiter dropped {dropped} requests in the last minute");
            }
            *last = now;
        }
    }
}

#[derive(Clone)]
pub struct RateLimiterLayer {
    buckets: TokenBuckets,
}

impl RateLimiterLayer {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            buckets: TokenBuckets::new(rate_per_sec, burst),
        }
    }

    /// Handle for periodic [`TokenBuckets::prune`] calls.
    pub fn buckets(&self) -> TokenBuckets {
        self.buckets.clone()
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            buckets: self.buckets.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter<S> {
    inner: S,
    buckets: TokenBuckets,
}

impl<S, ReqBody> Service<Request<ReqBody>> for RateLimiter<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if let Some(client) = client_id(&req) {
            if !self.buckets.try_acquire(&client, Instant::now()) {
                self.buckets.record_drop();
                return Box::pin(async move { Ok(too_many_requests()) });
            }
        }

        let fut = self.inner.call(req);
        Box::pin(fut)
    }
}

fn too_many_requests() -> Response<Body> {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "rate limited" })),
    )
        .into_response()
}

fn client_id<B>(req: &Request<B>) -> Option<String> {
    let headers = req.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|list| list.split(',').next());
    let real_ip = || headers.get("x-real-ip").and_then(|h| h.to_str().ok());
    forwarded
        .or_else(real_ip)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
