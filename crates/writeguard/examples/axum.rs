//! Run with
//!
//! ```not_rust
//! WRITEGUARD_PROJECT_ID=my-project \
//! WRITEGUARD_ADMIN_EMAILS=admin@example.com \
//! cargo run --example axum
//! ```

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use writeguard::{Config, Guard, MemoryCache, RateLimit, RateLimiter};

#[derive(Clone)]
struct AppState {
    guard: Guard,
    votes: RateLimiter,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,writeguard=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap();
    let guard = Guard::new(&config, Arc::new(MemoryCache::default())).unwrap();
    let votes = guard.rate_limiter(Duration::from_secs(60));

    let state = AppState { guard, votes };

    let admin = Router::new()
        .route("/admin/posts", post(publish))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    let public = Router::new()
        .route("/posts/{id}/vote", post(vote))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            vote_limit_middleware,
        ));

    let app = admin.merge(public).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:4000")
        .await
        .unwrap();
    tracing::debug!("listening on {}", listener.local_addr().unwrap());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.guard.access().is_admin(request.headers()).await {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

async fn vote_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let key = RateLimiter::key("vote", &peer.ip().to_string());

    match state.votes.check(&key).await {
        Ok(RateLimit::Allowed) => {}
        Ok(RateLimit::Throttled) => {
            let retry_after = state.votes.ttl().as_secs().to_string();
            return (StatusCode::TOO_MANY_REQUESTS, [(RETRY_AFTER, retry_after)]).into_response();
        }
        Err(e) => {
            tracing::warn!("rate limiter unavailable: {e}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    let response = next.run(request).await;

    // Only a vote that was actually counted starts the window
    if response.status().is_success() {
        if let Err(e) = state.votes.record(&key).await {
            tracing::warn!("failed to record vote window: {e}");
        }
    }

    response
}

async fn publish() -> &'static str {
    "Published"
}

async fn vote() -> &'static str {
    "Vote counted"
}
