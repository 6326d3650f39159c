use crate::api::routes;
use crate::config::SharedConfig;
use crate::update::SharedUpdater;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use hyper::server::conn::AddrIncoming;
use hyper::server::Builder;
use std::future::Future;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::num::NonZeroU32;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// How often per-client rate limiter state that has fully replenished is dropped.
const RATE_LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub updater: SharedUpdater,
    /// Per client IP update quota, absent when rate limiting is disabled.
    pub rate_limiter: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
}

impl AppState {
    fn new(config: SharedConfig, updater: SharedUpdater) -> Self {
        let rate_limiter = NonZeroU32::new(config.rate_limit_per_minute)
            .map(|per_minute| Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))));
        if let Some(limiter) = &rate_limiter {
            spawn_pruner(Arc::downgrade(limiter), RATE_LIMITER_PRUNE_INTERVAL);
        }
        Self {
            config,
            updater,
            rate_limiter,
        }
    }
}

/// Bind [`Config::api_bind_addr`][crate::config::Config::api_bind_addr] and return the API
/// server future.
pub fn new(
    config: SharedConfig,
    updater: SharedUpdater,
) -> hyper::Result<impl Future<Output = hyper::Result<()>>> {
    let builder = axum::Server::try_bind(&config.api_bind_addr)?;
    Ok(serve(builder, config, updater))
}

/// Return the API server future for an already bound listener.
pub fn from_tcp(
    listener: TcpListener,
    config: SharedConfig,
    updater: SharedUpdater,
) -> hyper::Result<impl Future<Output = hyper::Result<()>>> {
    let builder = axum::Server::from_tcp(listener)?;
    Ok(serve(builder, config, updater))
}

fn serve(
    builder: Builder<AddrIncoming>,
    config: SharedConfig,
    updater: SharedUpdater,
) -> impl Future<Output = hyper::Result<()>> {
    builder.serve(
        routes::new(AppState::new(config, updater))
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
