use thiserror::Error;

use crate::ledger::LedgerError;

pub const AVAILABILITY_FAILED_MESSAGE: &str = "Failed to check availability. Please try again.";
pub const BOOKING_FAILED_MESSAGE: &str = "Failed to book venue. Please try again.";

/// Every ledger failure leaves the reconciler as one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcilerError {
    /// At least one slot query failed; no map was produced.
    #[error("{}", AVAILABILITY_FAILED_MESSAGE)]
    AvailabilityQuery {
        #[source]
        source: LedgerError,
    },

    #[error("{reason}")]
    BookingSubmission { reason: String },

    /// Rejected locally, before any ledger call.
    #[error("{0}")]
    InvalidSelection(String),
}

impl ReconcilerError {
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        ReconcilerError::InvalidSelection(message.into())
    }

    pub fn booking_failed(source: &LedgerError) -> Self {
        ReconcilerError::BookingSubmission {
            reason: source
                .reason()
                .unwrap_or_else(|| BOOKING_FAILED_MESSAGE.to_string()),
        }
    }
}
