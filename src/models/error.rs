use thiserror::Error;

use super::booking::MAX_BOOKING_HOURS;

/// Input rejected before it reaches the ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("hourly_rate must be positive")]
    NonPositiveRate,

    #[error("{0} must be a decimal number")]
    InvalidCoordinate(&'static str),

    #[error("duration must be between 1 and {max} hours, got {hours}", max = MAX_BOOKING_HOURS)]
    DurationOutOfRange { hours: u8 },
}
