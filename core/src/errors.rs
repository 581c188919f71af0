use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::exec_env::ExecError;
use crate::ledger::{AddressParseError, LedgerError};
use crate::oracle::OracleError;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum AppError {
    #[error("Internal server error")]
    Internal(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Upstream(_) => "UPSTREAM_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

// Abort-class ledger failures (insufficient funds/allowance) map to 409,
// plain input rejections to 400. Neither leaves partial state behind.
impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        if err.is_abort() {
            AppError::Conflict(err.to_string())
        } else {
            AppError::BadRequest(err.to_string())
        }
    }
}

impl From<OracleError> for AppError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::MissingArgument(_)
            | OracleError::UnknownOracleType(_)
            | OracleError::InvalidAddress { .. } => AppError::BadRequest(err.to_string()),
            OracleError::MalformedResult(_) | OracleError::Exec(_) => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

impl From<AddressParseError> for AppError {
    fn from(err: AddressParseError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ExecError> for AppError {
    fn from(err: ExecError) -> Self {
        AppError::Upstream(err.to_string())
    }
}
