//! Per-IP fixed-window rate limiting for route groups.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agro_settings::RateLimitSettings;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tracing::warn;

use crate::error::ApiError;

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_secs(60);

struct Bucket {
    started: Instant,
    count: u32,
}

/// Counts requests per client IP in fixed windows.
pub struct RateLimiter {
    group: &'static str,
    limit: u32,
    window: Duration,
    buckets: DashMap<IpAddr, Bucket>,
}

impl RateLimiter {
    /// `limit` requests per minute for `group`.
    pub fn per_minute(group: &'static str, limit: u32) -> Self {
        Self::new(group, limit, WINDOW)
    }

    /// `limit` requests per `window` for `group`.
    pub fn new(group: &'static str, limit: u32, window: Duration) -> Self {
        Self {
            group,
            limit,
            window,
            buckets: DashMap::new(),
        }
    }

    /// Record one request from `ip`; `false` once the window is exhausted.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut bucket = self.buckets.entry(ip).or_insert(Bucket {
            started: now,
            count: 0,
        });
        if now.duration_since(bucket.started) >= self.window {
            bucket.started = now;
            bucket.count = 0;
        }
        if bucket.count >= self.limit {
            return false;
        }
        bucket.count += 1;
        true
    }

    /// Drop buckets whose window has passed.
    pub fn prune(&self) {
        let now = Instant::now();
        self.buckets
            .retain(|_, b| now.duration_since(b.started) < self.window);
    }

    /// Number of tracked clients.
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }
}

/// One limiter per route group.
#[derive(Clone)]
pub struct RateLimiters {
    /// `/api/users/*`.
    pub users: Arc<RateLimiter>,
    /// `/api/inventory/*`.
    pub inventory: Arc<RateLimiter>,
    /// `/api/ai/*`.
    pub ai: Arc<RateLimiter>,
    /// `/api/test/*`.
    pub test: Arc<RateLimiter>,
}

impl RateLimiters {
    /// Build the group limiters from settings.
    pub fn from_settings(limits: &RateLimitSettings) -> Self {
        Self {
            users: Arc::new(RateLimiter::per_minute("users", limits.users_per_minute)),
            inventory: Arc::new(RateLimiter::per_minute("inventory", limits.inventory_per_minute)),
            ai: Arc::new(RateLimiter::per_minute("ai", limits.ai_per_minute)),
            test: Arc::new(RateLimiter::per_minute("test", limits.test_per_minute)),
        }
    }

    /// Prune every group.
    pub fn prune_all(&self) {
        for limiter in [&self.users, &self.inventory, &self.ai, &self.test] {
            limiter.prune();
        }
    }
}

/// Socket peer address, else the first `X-Forwarded-For` entry.
pub fn client_ip(peer: Option<SocketAddr>, headers: &HeaderMap) -> IpAddr {
    if let Some(addr) = peer {
        return addr.ip();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware rejecting requests over the group budget with 403.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(peer, request.headers());

    if !limiter.check(ip) {
        warn!(group = limiter.group, %ip, "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}
