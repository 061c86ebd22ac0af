//! HTTP router setup.
//!
//! # Responsibilities
//! - Create the Axum Router with the player data route table
//! - Wire up middleware (request ID, tracing, timeouts, fault reporting)
//!
//! # Design Decisions
//! - Read timeout bounds reading the request body here; the listener bounds
//!   reading the headers with the same duration
//! - Write timeout bounds producing the whole response

use std::sync::Arc;

use axum::{body::Body, http::Request, middleware, routing::get, Router};
use tower_http::{
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::ServerConfig;
use crate::http::handlers::{report_faults, update_player_data, UPDATE_PLAYER_DATA_PATH};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::OutcomeSink;
use crate::repository::PlayerDataRepository;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Where handler faults are reported.
    pub faults: OutcomeSink,
    /// Player data source for handlers. The only route is still a stub that
    /// fails before reading it, but the router state keeps the backend seam.
    pub repository: Arc<dyn PlayerDataRepository>,
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ServerConfig, state: AppState) -> Router {
    Router::new()
        .route(UPDATE_PLAYER_DATA_PATH, get(update_player_data))
        .layer(middleware::from_fn_with_state(state.clone(), report_faults))
        .with_state(state)
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout()))
        .layer(TimeoutLayer::new(config.write_timeout()))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(set_request_id_layer())
}

fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id(request),
    )
}
