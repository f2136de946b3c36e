use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::ResponseError;
use futures::future::LocalBoxFuture;
use tokio::sync::RwLock;

use crate::handlers::error::HttpErrorResponse;

const SHARD_COUNT: usize = 16;

/// A fixed counting window for one client address.
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u64,
}

impl Window {
    fn new(now: Instant) -> Self {
        Window {
            started: now,
            count: 1,
        }
    }

    fn is_over(&self, period: Duration, now: Instant) -> bool {
        now.duration_since(self.started) >= period
    }
}

struct Shard {
    windows: HashMap<IpAddr, Mutex<Window>>,
    last_sweep: Instant,
}

impl Shard {
    fn new() -> Self {
        Shard {
            windows: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }
}

type Shards = Arc<[RwLock<Shard>; SHARD_COUNT]>;

/// Per-route request limiting keyed by client IP address. Each address may make
/// `max_per_period` requests in a window that opens with its first request and lasts `period`.
/// Clones share counts, so one `Limiter` can guard several routes as a group.
#[derive(Clone)]
pub struct Limiter {
    max_per_period: u64,
    period: Duration,
    sweep_frequency: Duration,
    shards: Shards,
}

impl Limiter {
    /// Windows that have run out are swept from a shard at most once per `sweep_frequency`.
    /// Panics if `period` is greater than `sweep_frequency`.
    pub fn new(max_per_period: u64, period: Duration, sweep_frequency: Duration) -> Self {
        if period > sweep_frequency {
            panic!("Period cannot be greater than sweep frequency");
        }

        Limiter {
            max_per_period,
            period,
            sweep_frequency,
            shards: Arc::new(std::array::from_fn(|_| RwLock::new(Shard::new()))),
        }
    }

    /// Counts a request from `ip`. Returns the time left in the client's window if the client
    /// has used up its requests.
    async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let shard = &self.shards[shard_index(&ip)];
        let now = Instant::now();

        {
            // Most requests come from known addresses and only need the read lock
            let shard = shard.read().await;

            if let Some(window) = shard.windows.get(&ip) {
                let mut window = window.lock().unwrap_or_else(|e| e.into_inner());
                return self.count(&mut window, now);
            }
        }

        let mut shard = shard.write().await;

        if now.duration_since(shard.last_sweep) >= self.sweep_frequency {
            let period = self.period;
            shard.windows.retain(|_, window| {
                !window
                    .get_mut()
                    .map(|w| w.is_over(period, now))
                    .unwrap_or(true)
            });
            shard.windows.shrink_to_fit();
            shard.last_sweep = now;
        }

        // Another request from the same address may have added the window while this one
        // waited for the write lock
        if let Some(window) = shard.windows.get_mut(&ip) {
            let window = window.get_mut().unwrap_or_else(|e| e.into_inner());
            return self.count(window, now);
        }

        shard.windows.insert(ip, Mutex::new(Window::new(now)));
        Ok(())
    }

    fn count(&self, window: &mut Window, now: Instant) -> Result<(), Duration> {
        if window.is_over(self.period, now) {
            *window = Window::new(now);
            return Ok(());
        }

        if window.count >= self.max_per_period {
            return Err(self.period - now.duration_since(window.started));
        }

        window.count += 1;
        Ok(())
    }
}

fn shard_index(ip: &IpAddr) -> usize {
    let mut hasher = DefaultHasher::new();
    ip.hash(&mut hasher);
    hasher.finish() as usize % SHARD_COUNT
}

fn client_ip(req: &ServiceRequest) -> IpAddr {
    if cfg!(test) {
        return req
            .headers()
            .get("test-ip")
            .and_then(|ip| ip.to_str().ok())
            .and_then(|ip| ip.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    // Only missing for requests that didn't come over a socket. Those share one window.
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

impl<S, B> Transform<S, ServiceRequest> for Limiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = LimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct LimiterMiddleware<S> {
    service: S,
    limiter: Limiter,
}

impl<S, B> Service<ServiceRequest> for LimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ip = client_ip(&req);
        let http_req = req.request().clone();
        let limiter = self.limiter.clone();
        let req_fut = self.service.call(req);

        Box::pin(async move {
            if let Err(retry_after) = limiter.check(ip).await {
                log::debug!("Limited requests from {ip}");

                let resp = HttpErrorResponse::TooManyRequests(format!(
                    "Too many requests. Try again in {} seconds.",
                    retry_after.as_secs().max(1)
                ))
                .error_response();

                return Ok(ServiceResponse::new(http_req, resp).map_into_right_body());
            }

            req_fut.await.map(ServiceResponse::map_into_left_body)
        })
    }
}
