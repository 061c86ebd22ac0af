//! Route handlers and fault reporting.
//!
//! Handlers return `Result<_, HandlerFault>`. A fault renders as a 500 whose
//! body is the fault text, and tags the response so [`report_faults`] can
//! forward it to the fault channel.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::http::players::PlayerDataJson;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::lifecycle::HandlerError;
use crate::observability::metrics;

pub const UPDATE_PLAYER_DATA_PATH: &str = "/update-player-data";

/// A failure while handling a single request.
#[derive(Debug, Error)]
pub enum HandlerFault {
    #[error("not implemented")]
    NotImplemented,
}

/// Fault text attached to responses built from a [`HandlerFault`].
#[derive(Debug, Clone)]
struct FaultTag(String);

impl IntoResponse for HandlerFault {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, message.clone()).into_response();
        response.extensions_mut().insert(FaultTag(message));
        response
    }
}

/// Middleware forwarding handler faults to the fault channel.
pub async fn report_faults(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let id = request_id(&request).to_string();

    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16());

    let fault = response.extensions().get::<FaultTag>().map(|tag| tag.0.clone());
    if let Some(message) = fault {
        tracing::debug!(request_id = %id, error = %message, "Reporting handler fault");
        state.faults.report(HandlerError::new(method, uri, message)).await;
    }

    response
}

/// `GET /update-player-data`: not implemented yet.
pub async fn update_player_data() -> Result<Json<Vec<PlayerDataJson>>, HandlerFault> {
    Err(HandlerFault::NotImplemented)
}
