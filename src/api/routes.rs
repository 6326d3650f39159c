use crate::api::api_error::APIError;
use crate::api::model::UpdateQuery;
use crate::api::server::AppState;
use crate::auth;
use crate::error::Error;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/ddns/update", get(update))
        .route("/ap", get(update))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn update(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    WithRejection(Query(query), _): WithRejection<Query<UpdateQuery>, APIError>,
) -> Result<String, APIError> {
    let client_addr = client_addr.ip();

    if let Some(limiter) = &state.rate_limiter {
        if limiter.check_key(&client_addr).is_err() {
            tracing::warn!("rate limited update from {client_addr}");
            return Err(Error::RateLimited(client_addr).into());
        }
    }

    tracing::info!(
        "update from {client_addr} for {:?} to {:?}",
        query.hostname.as_deref().unwrap_or_default(),
        query.address().unwrap_or_default()
    );

    let basic_auth = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth::basic_credentials);
    let request = query.into_request(basic_auth).map_err(|err| {
        tracing::warn!("rejected update from {client_addr}: {err}");
        err
    })?;

    let outcome = state.updater.handle(request).await?;
    Ok(outcome.to_string())
}
