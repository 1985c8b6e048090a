use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{keyed::DashMapStateStore, InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

pub const GLOBAL_LIMIT_MESSAGE: &str = "Global API rate limit exceeded!";
pub const IP_LIMIT_MESSAGE: &str = "Too many requests, slow down!";

/// Rate limiter shared by every request
pub type UnkeyedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// `limit` cells per `window`, the whole allowance usable as a burst.
fn quota(limit: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let period = (window / burst.get()).max(Duration::from_nanos(1));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

pub fn create_unkeyed_rate_limiter(limit: u32, window_seconds: u64) -> UnkeyedRateLimiter {
    Arc::new(RateLimiter::direct(quota(
        limit,
        Duration::from_secs(window_seconds),
    )))
}

pub fn create_ip_rate_limiter(limit: u32, window_seconds: u64) -> IpRateLimiter {
    Arc::new(RateLimiter::dashmap(quota(
        limit,
        Duration::from_secs(window_seconds),
    )))
}

/// Picks the address a request is rate limited under.
///
/// The TCP peer is the key unless that peer is a trusted proxy. Behind a
/// trusted proxy, `X-Forwarded-For` is walked from the right and the first
/// untrusted hop wins.
#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    trusted_proxies: Arc<Vec<IpAddr>>,
}

impl ClientIpResolver {
    pub fn new(trusted_proxies: Vec<IpAddr>) -> Self {
        Self {
            trusted_proxies: Arc::new(trusted_proxies),
        }
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.contains(ip)
    }

    pub fn resolve(&self, request: &Request) -> Option<IpAddr> {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())?;

        if !self.is_trusted(&peer) {
            return Some(peer);
        }

        let forwarded = request
            .headers()
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
            .collect::<Vec<_>>();

        Some(
            forwarded
                .into_iter()
                .rev()
                .find(|hop| !self.is_trusted(hop))
                .unwrap_or(peer),
        )
    }
}

/// State for [`ip_rate_limit_middleware`].
#[derive(Clone)]
pub struct IpRateLimit {
    pub limiter: IpRateLimiter,
    pub resolver: ClientIpResolver,
}

impl IpRateLimit {
    pub fn new(limiter: IpRateLimiter, resolver: ClientIpResolver) -> Self {
        Self { limiter, resolver }
    }
}

fn retry_after_secs(wait: Duration) -> u64 {
    wait.as_secs().max(1)
}

/// Middleware enforcing the global request ceiling
pub async fn rate_limit_middleware(
    State(limiter): State<UnkeyedRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(negative) => {
            let wait_time = negative.wait_time_from(DefaultClock::default().now());
            tracing::warn!(retry_after_ms = wait_time.as_millis() as u64, "Global rate limit hit");
            Err(AppError::TooManyRequests(
                GLOBAL_LIMIT_MESSAGE.to_string(),
                Some(retry_after_secs(wait_time)),
            ))
        }
    }
}

/// Middleware enforcing the per-client-address ceiling
pub async fn ip_rate_limit_middleware(
    State(state): State<IpRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.resolver.resolve(&request) {
        Some(ip) => match state.limiter.check_key(&ip) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                tracing::warn!(client_ip = %ip, "Per-IP rate limit hit");
                Err(AppError::TooManyRequests(
                    IP_LIMIT_MESSAGE.to_string(),
                    Some(retry_after_secs(wait_time)),
                ))
            }
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
