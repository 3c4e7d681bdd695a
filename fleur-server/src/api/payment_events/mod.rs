//! Credit event ingestion

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/payment/insert-event", post(handler::insert_event))
}
