use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use shared::ApiResponse;
use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::dispense::orchestrator::DispenseError;
use crate::payments::ledger::LedgerError;
use crate::store::StorageError;

/// Application error type with HTTP status mapping
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "E2001"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "E0003"),
            AppError::InvalidState(_) => (StatusCode::CONFLICT, "E0004"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "E0002"),
            AppError::BusinessRule(_) => (StatusCode::UNPROCESSABLE_ENTITY, "E0005"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9002"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9001"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ApiResponse::<()>::error(code, &self.to_string());
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Success response helper
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SlotCodeExists(code) => {
                AppError::InvalidState(format!("Slot code already exists: {}", code))
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Storage(e) => AppError::from(e),
            LedgerError::PaymentNotFound(id) => AppError::NotFound(format!("Payment {}", id)),
            LedgerError::OrderNotFound(id) => AppError::NotFound(format!("Order {}", id)),
            LedgerError::InvalidAmount(msg) => AppError::Validation(msg),
            LedgerError::PaymentClosed(id) => {
                AppError::InvalidState(format!("Payment {} is already closed", id))
            }
        }
    }
}

impl From<DispenseError> for AppError {
    fn from(err: DispenseError) -> Self {
        match err {
            DispenseError::Storage(e) => AppError::from(e),
            DispenseError::OrderNotFound(id) => AppError::NotFound(format!("Order {}", id)),
            DispenseError::PaymentNotFound(order_id) => {
                AppError::Internal(format!("Order {} has no payment record", order_id))
            }
            DispenseError::PaymentIncomplete(order_id) => {
                AppError::InvalidState(format!("Order {} is not fully paid", order_id))
            }
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Storage(e) => AppError::from(e),
            CheckoutError::ProductNotFound(id) => AppError::NotFound(format!("Product {}", id)),
            CheckoutError::ProductInactive(id) => {
                AppError::BusinessRule(format!("Product {} is not for sale", id))
            }
            CheckoutError::SlotUnavailable(msg) => AppError::BusinessRule(msg),
            CheckoutError::InvalidQuantity(msg) => AppError::Validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("x".into()).status_and_code(),
            (StatusCode::NOT_FOUND, "E0003")
        );
        assert_eq!(
            AppError::InvalidState("x".into()).status_and_code(),
            (StatusCode::CONFLICT, "E0004")
        );
        assert_eq!(
            AppError::Validation("x".into()).status_and_code(),
            (StatusCode::BAD_REQUEST, "E0002")
        );
        assert_eq!(
            AppError::BusinessRule("x".into()).status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "E0005")
        );
    }
}
