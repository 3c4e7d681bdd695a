//! Bridge HTTP endpoints
//!
//! The kiosk screen and the storefront server both talk to the bridge over
//! this small local API:
//!
//! - `POST /set-session` - bind the cabinet to a payment
//! - `POST /stack` - wait for one note and report the credit
//! - `POST /open-slot` - pulse a relay channel
//! - `GET /status` - device reachability
//! - `GET /healthz` - liveness
//!
//! Responses are flat `{ok, ...}` objects; the kiosk firmware side predates
//! the enveloped shape the storefront admin API uses.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{info, instrument, warn};

use crate::gateway::{CreditGateway, ReportError};
use crate::state::BridgeState;
use shared::{CreditAck, CreditEvent, OpenSlotRequest, OpenSlotResponse, SessionRequest, StackRequest, is_supported_bill};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0}")]
    BadRequest(String),

    #[error("No active payment session and no payment_id given")]
    NoSession,

    #[error("Note was not captured: {0}")]
    NotStacked(String),

    #[error("Device error: {0}")]
    Device(#[from] fleur_device::DeviceError),

    #[error("Note stacked but credit report failed: {0}")]
    ReportFailed(String),

    #[error("Credit rejected by server: {0}")]
    CreditRejected(String),
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::BadRequest(_) | BridgeError::NoSession => StatusCode::BAD_REQUEST,
            BridgeError::NotStacked(_) | BridgeError::CreditRejected(_) => StatusCode::CONFLICT,
            BridgeError::Device(_) | BridgeError::ReportFailed(_) => StatusCode::BAD_GATEWAY,
        };
        let body = json!({ "ok": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn build_app(state: BridgeState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/set-session", post(set_session))
        .route("/clear-session", post(clear_session))
        .route("/stack", post(stack))
        .route("/open-slot", post(open_slot))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Serialize)]
struct StatusResponse {
    ok: bool,
    simulate: bool,
    acceptor_online: bool,
    relay_online: bool,
    active_payment: Option<i64>,
}

async fn status(State(state): State<BridgeState>) -> Json<StatusResponse> {
    let acceptor_online = state.acceptor.is_online().await;
    let relay_online = state.relay.is_online().await;
    Json(StatusResponse {
        ok: acceptor_online && relay_online,
        simulate: state.config.simulate,
        acceptor_online,
        relay_online,
        active_payment: state.session.current_payment(),
    })
}

/// POST /set-session
async fn set_session(
    State(state): State<BridgeState>,
    Json(request): Json<SessionRequest>,
) -> Json<Value> {
    state.session.open(request.payment_id);
    info!(payment_id = request.payment_id, "Payment session opened");
    Json(json!({ "ok": true }))
}

/// POST /clear-session
async fn clear_session(State(state): State<BridgeState>) -> Json<Value> {
    state.session.clear();
    info!("Payment session cleared");
    Json(json!({ "ok": true }))
}

/// POST /stack
///
/// Drive one accept cycle for the requested denomination, then report the
/// credit. The explicit `payment_id` in the request wins over the bound
/// session. A stacked note with a failed report is the one outcome that
/// needs an operator; it comes back as 502 with the note already in the box.
#[instrument(skip(state), fields(bill = request.bill))]
async fn stack(
    State(state): State<BridgeState>,
    Json(request): Json<StackRequest>,
) -> Result<Json<CreditAck>, BridgeError> {
    if !is_supported_bill(request.bill) {
        return Err(BridgeError::BadRequest(format!(
            "unsupported bill: {}",
            request.bill
        )));
    }

    let payment_id = request
        .payment_id
        .or_else(|| state.session.current_payment())
        .ok_or(BridgeError::NoSession)?;

    let stacked = state.acceptor.accept(request.bill).await?;
    if !stacked {
        info!("No matching note captured before the deadline");
        return Err(BridgeError::NotStacked(
            "note rejected or not inserted in time".into(),
        ));
    }

    let event = CreditEvent {
        payment_id,
        amount: request.bill,
        source: Some("bill_acceptor".into()),
    };
    let ack = match state.reporter.report(&event).await {
        Ok(ack) => ack,
        Err(ReportError::Rejected(msg)) => {
            warn!(error = %msg, "Server rejected a stacked note");
            return Err(BridgeError::CreditRejected(msg));
        }
        Err(e) => {
            warn!(error = %e, "Stacked note could not be reported");
            return Err(BridgeError::ReportFailed(e.to_string()));
        }
    };

    if ack.completed {
        // Payment covered; the binding has served its purpose
        state.session.clear();
    }
    Ok(Json(ack))
}

/// POST /open-slot
#[instrument(skip(state), fields(channel = request.channel))]
async fn open_slot(
    State(state): State<BridgeState>,
    Json(request): Json<OpenSlotRequest>,
) -> Result<Json<OpenSlotResponse>, BridgeError> {
    state.relay.pulse(request.channel).await?;
    Ok(Json(OpenSlotResponse {
        ok: true,
        channel: Some(request.channel),
        error: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleur_device::{BillAcceptor, DeviceResult, SimulatedAcceptor};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Acceptor whose note is always rejected or times out
    struct RejectingAcceptor;

    #[async_trait]
    impl BillAcceptor for RejectingAcceptor {
        async fn accept(&self, _amount: u32) -> DeviceResult<bool> {
            Ok(false)
        }

        async fn is_online(&self) -> bool {
            true
        }
    }

    /// Gateway double that records events and answers a fixed ack
    struct RecordingGateway {
        events: Mutex<Vec<CreditEvent>>,
        completed: bool,
        fail: bool,
    }

    impl RecordingGateway {
        fn new(completed: bool) -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                completed,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                completed: false,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl CreditGateway for RecordingGateway {
        async fn report(&self, event: &CreditEvent) -> Result<CreditAck, ReportError> {
            self.events.lock().push(event.clone());
            if self.fail {
                return Err(ReportError::Exhausted {
                    attempts: 3,
                    last_error: "connection refused".into(),
                });
            }
            Ok(CreditAck {
                ok: true,
                completed: self.completed,
            })
        }
    }

    fn fast_acceptor() -> Arc<SimulatedAcceptor> {
        Arc::new(SimulatedAcceptor::new(Duration::from_millis(1)))
    }

    fn stack_request(bill: u32, payment_id: Option<i64>) -> Json<StackRequest> {
        Json(StackRequest { bill, payment_id })
    }

    #[tokio::test]
    async fn test_stack_requires_session_or_payment_id() {
        let gateway = Arc::new(RecordingGateway::new(false));
        let state = BridgeState::for_tests(fast_acceptor(), gateway.clone());

        let result = stack(State(state), stack_request(500, None)).await;
        assert!(matches!(result, Err(BridgeError::NoSession)));
        assert!(gateway.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stack_rejects_unsupported_bill() {
        let gateway = Arc::new(RecordingGateway::new(false));
        let state = BridgeState::for_tests(fast_acceptor(), gateway.clone());
        state.session.open(7);

        let result = stack(State(state), stack_request(200, None)).await;
        assert!(matches!(result, Err(BridgeError::BadRequest(_))));
        assert!(gateway.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stack_uncaptured_note_reports_nothing() {
        let gateway = Arc::new(RecordingGateway::new(false));
        let state = BridgeState::for_tests(Arc::new(RejectingAcceptor), gateway.clone());
        state.session.open(7);

        let result = stack(State(state.clone()), stack_request(500, None)).await;
        assert!(matches!(result, Err(BridgeError::NotStacked(_))));
        // No credit for a note that never reached the cashbox
        assert!(gateway.events.lock().is_empty());
        // Session survives for the next attempt
        assert_eq!(state.session.current_payment(), Some(7));
    }

    #[tokio::test]
    async fn test_stack_explicit_payment_id_wins_over_session() {
        let gateway = Arc::new(RecordingGateway::new(false));
        let state = BridgeState::for_tests(fast_acceptor(), gateway.clone());
        state.session.open(1);

        let ack = stack(State(state.clone()), stack_request(1000, Some(2)))
            .await
            .unwrap();
        assert!(ack.ok);
        assert!(!ack.completed);

        let events = gateway.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payment_id, 2);
        assert_eq!(events[0].amount, 1000);
        // Incomplete payment keeps the session bound
        drop(events);
        assert_eq!(state.session.current_payment(), Some(1));
    }

    #[tokio::test]
    async fn test_completed_ack_clears_session() {
        let gateway = Arc::new(RecordingGateway::new(true));
        let state = BridgeState::for_tests(fast_acceptor(), gateway.clone());
        state.session.open(7);

        let ack = stack(State(state.clone()), stack_request(500, None))
            .await
            .unwrap();
        assert!(ack.completed);
        assert_eq!(gateway.events.lock()[0].payment_id, 7);
        assert_eq!(state.session.current_payment(), None);
    }

    #[tokio::test]
    async fn test_stack_report_failure_is_bad_gateway() {
        let gateway = Arc::new(RecordingGateway::failing());
        let state = BridgeState::for_tests(fast_acceptor(), gateway.clone());
        state.session.open(7);

        let result = stack(State(state), stack_request(500, None)).await;
        match result {
            Err(e @ BridgeError::ReportFailed(_)) => {
                assert_eq!(e.into_response().status(), StatusCode::BAD_GATEWAY);
            }
            other => panic!("expected ReportFailed, got {:?}", other.map(|j| j.0)),
        }
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (
                BridgeError::BadRequest("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (BridgeError::NoSession, StatusCode::BAD_REQUEST),
            (
                BridgeError::NotStacked("x".into()),
                StatusCode::CONFLICT,
            ),
            (
                BridgeError::ReportFailed("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
