use crate::ledger::LedgerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("{1}")]
    Ledger(&'static str, String, StatusCode),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Ledger(kind, _, _) => *kind,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::UnknownAsset(_) => StatusCode::NOT_FOUND,
            LedgerError::NotAuthorized(_) => StatusCode::FORBIDDEN,
            LedgerError::AlreadyRegistered(_) | LedgerError::NothingToClaim => StatusCode::CONFLICT,
            LedgerError::InsufficientPosition { .. }
            | LedgerError::InvalidAmount
            | LedgerError::InvalidAsset(_)
            | LedgerError::InvalidAddress(_)
            | LedgerError::AssetDisabled(_)
            | LedgerError::Paused => StatusCode::BAD_REQUEST,
            LedgerError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::SettlementFailed(_) | LedgerError::TransferFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            LedgerError::Overflow | LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::Ledger(err.kind(), err.to_string(), status)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Ledger(_, msg, status) => (status, msg),
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}
