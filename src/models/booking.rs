use serde::{Deserialize, Serialize};

use super::{amount, Address, Amount, ValidationError, VenueId};

pub type BookingId = u64;

pub const MAX_BOOKING_HOURS: u8 = 4;

/// Booking length in whole hours, always within `1..=MAX_BOOKING_HOURS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BookingDuration(u8);

impl BookingDuration {
    pub const ONE_HOUR: BookingDuration = BookingDuration(1);

    pub fn new(hours: u8) -> Result<Self, ValidationError> {
        if (1..=MAX_BOOKING_HOURS).contains(&hours) {
            Ok(Self(hours))
        } else {
            Err(ValidationError::DurationOutOfRange { hours })
        }
    }

    pub fn hours(self) -> u8 {
        self.0
    }
}

impl Default for BookingDuration {
    fn default() -> Self {
        Self::ONE_HOUR
    }
}

impl TryFrom<u8> for BookingDuration {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BookingDuration> for u8 {
    fn from(value: BookingDuration) -> Self {
        value.0
    }
}

/// Booking as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub venue_id: VenueId,
    pub time_slot: i64,
    pub duration: BookingDuration,
    pub booker: Address,
    pub is_cancelled: bool,
}

/// The exact request submitted to the ledger. `total_price` is only ever
/// produced by integer multiplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRequest {
    pub venue_id: VenueId,
    pub start: i64,
    pub duration: BookingDuration,
    #[serde(with = "amount::as_string")]
    pub total_price: Amount,
}
