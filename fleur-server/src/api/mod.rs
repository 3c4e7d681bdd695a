//! API route modules
//!
//! # Structure
//!
//! - [`health`] - liveness probe
//! - [`payment_events`] - credit event ingestion from the hardware bridge
//! - [`payments`] - payment status and cancellation
//! - [`checkout`] - order creation
//! - [`orders`] - order listing and fulfillment
//! - [`slots`] - cabinet slot management
//! - [`products`] - catalog products
//! - [`categories`] - catalog categories

pub mod categories;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod payment_events;
pub mod payments;
pub mod products;
pub mod slots;

use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::core::ServerState;

pub fn build_app(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(payment_events::router())
        .merge(payments::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(slots::router())
        .merge(products::router())
        .merge(categories::router())
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Log every request with method, matched path, status and latency
async fn log_request(req: Request, next: Next) -> Response {
    let start = Instant::now();

    // Take the caller's request id if present, otherwise mint one
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency.as_millis(),
            "Request completed with error"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency.as_millis(),
            "Request completed"
        );
    }

    response
}
