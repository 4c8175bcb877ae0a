// auth-server/src/middleware/rate_limiter.rs
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse, ResponseError,
};
use dashmap::DashMap;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// The original deployment allowed ten auth attempts per minute per client
const MAX_REQUESTS_PER_MINUTE: usize = 10;
const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

// Custom error for rate limiting
#[derive(Debug)]
struct RateLimitExceeded;

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, "60"))
            .body("Rate limit exceeded. Please try again later.")
    }
}

/// Per-IP sliding-window limiter for the handshake endpoints
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_per_window: usize,
    store: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            max_per_window: MAX_REQUESTS_PER_MINUTE,
            store: Arc::new(DashMap::new()),
        }
    }

    pub fn with_limit(mut self, max_per_window: usize) -> Self {
        self.max_per_window = max_per_window;
        self
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS);

        let mut hits = self.store.entry(ip.to_string()).or_default();
        hits.retain(|t| now.duration_since(*t) < window);

        if hits.len() >= self.max_per_window {
            true
        } else {
            hits.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_rate_limit = self.limiter.paths.iter().any(|p| path.starts_with(p));

        if should_rate_limit {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);

                return Box::pin(async { Err(RateLimitExceeded.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}
