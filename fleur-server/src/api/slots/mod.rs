//! Cabinet slot management

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/slots", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        // Seed must come before /{id} to avoid path conflicts
        .route("/seed", post(handler::seed))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
}
