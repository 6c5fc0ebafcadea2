//! Booking price arithmetic.
//!
//! [`total_price`] is the only path into a submitted payment. The ether
//! strings from [`format_ether`] are for display and are never parsed back.

use rust_decimal::Decimal;

use super::ReconcilerError;
use crate::models::{Amount, BookingDuration, BookingRequest, Venue};

const ETHER_DECIMALS: u32 = 18;
const DISPLAY_DECIMALS: u32 = 5;
const WEI_PER_ETHER: Amount = 1_000_000_000_000_000_000;

pub fn total_price(hourly_rate: Amount, duration: BookingDuration) -> Option<Amount> {
    hourly_rate.checked_mul(Amount::from(duration.hours()))
}

pub fn booking_request(
    venue: &Venue,
    start: i64,
    duration: BookingDuration,
) -> Result<BookingRequest, ReconcilerError> {
    let total_price = total_price(venue.hourly_rate, duration).ok_or_else(|| {
        ReconcilerError::InvalidSelection("booking price exceeds the representable range".into())
    })?;

    Ok(BookingRequest {
        venue_id: venue.id,
        start,
        duration,
        total_price,
    })
}

/// Wei rendered as ether with five decimals, e.g. `0.01000`.
pub fn format_ether(wei: Amount) -> String {
    let decimal = i128::try_from(wei)
        .ok()
        .and_then(|value| Decimal::try_from_i128_with_scale(value, ETHER_DECIMALS).ok());

    match decimal {
        Some(value) => format!("{:.*}", DISPLAY_DECIMALS as usize, value.round_dp(DISPLAY_DECIMALS)),
        None => {
            // Beyond Decimal's 96-bit mantissa; truncate instead.
            let unit = WEI_PER_ETHER / 10u128.pow(DISPLAY_DECIMALS);
            format!(
                "{}.{:05}",
                wei / WEI_PER_ETHER,
                (wei % WEI_PER_ETHER) / unit
            )
        }
    }
}
