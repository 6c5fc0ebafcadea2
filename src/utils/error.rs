use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::ledger::LedgerError;
use crate::models::ValidationError;
use crate::reconciler::ReconcilerError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Availability check failed: {0}")]
    AvailabilityQueryError(String),

    #[error("Booking failed: {0}")]
    BookingSubmissionError(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AvailabilityQueryError(_) => StatusCode::BAD_GATEWAY,
            AppError::BookingSubmissionError(_) => StatusCode::CONFLICT,
            AppError::TransactionRejected(_) => StatusCode::CONFLICT,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AvailabilityQueryError(_) => "AVAILABILITY_QUERY_ERROR",
            AppError::BookingSubmissionError(_) => "BOOKING_SUBMISSION_ERROR",
            AppError::TransactionRejected(_) => "TRANSACTION_REJECTED",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::BookingSubmissionError(msg)
            | AppError::TransactionRejected(msg) => {
                warn!(code = self.code(), message = %msg, "Request failed");
            }
            AppError::AvailabilityQueryError(msg)
            | AppError::ExternalServiceError(msg)
            | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
        }
    }
}

impl From<ReconcilerError> for AppError {
    fn from(value: ReconcilerError) -> Self {
        match value {
            ReconcilerError::InvalidSelection(msg) => AppError::ValidationError(msg),
            ReconcilerError::BookingSubmission { reason } => AppError::BookingSubmissionError(reason),
            ReconcilerError::AvailabilityQuery { source } => {
                AppError::AvailabilityQueryError(source.to_string())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        AppError::ValidationError(value.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(what) => AppError::NotFound(what),
            LedgerError::Rejected { .. } | LedgerError::UserRejected => {
                AppError::TransactionRejected(value.reason().unwrap_or_else(|| value.to_string()))
            }
            LedgerError::Transport(msg) => AppError::ExternalServiceError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::BookingSubmissionError(msg)
            | AppError::TransactionRejected(msg) => msg.clone(),
            AppError::AvailabilityQueryError(_) => {
                crate::reconciler::error::AVAILABILITY_FAILED_MESSAGE.to_string()
            }
            AppError::ExternalServiceError(_) => "The ledger could not be reached".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
