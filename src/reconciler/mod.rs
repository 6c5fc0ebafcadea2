//! Booking-availability reconciliation.
//!
//! Pure operations over a day's slot grid live here; [`calendar`] strings
//! them into the stateful flow a booking screen drives.

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::ledger::LedgerClient;
use crate::models::{Address, BookingDuration, BookingId, TimeSlot, Venue};

pub mod availability;
pub mod calendar;
pub mod error;
pub mod pricing;
pub mod slots;

pub use availability::{is_contiguous_block_free, AvailabilityMap};
pub use calendar::{
    AvailabilitySnapshot, BookingCalendar, BookingState, CalendarView, RefreshOutcome, SlotView,
};
pub use error::ReconcilerError;
pub use pricing::{format_ether, total_price};
pub use slots::{generate_slots, upcoming_dates};

/// Queries every slot concurrently and joins on all of them. Any single
/// failure fails the whole refresh.
pub async fn refresh_availability(
    ledger: &dyn LedgerClient,
    venue: &Venue,
    slots: &[TimeSlot],
) -> Result<AvailabilityMap, ReconcilerError> {
    let queries = slots.iter().map(|slot| async move {
        ledger
            .check_availability(venue.id, slot.timestamp)
            .await
            .map(|free| (slot.timestamp, free))
    });

    let results = try_join_all(queries).await.map_err(|source| {
        warn!(venue_id = venue.id, error = %source, "Availability query failed");
        ReconcilerError::AvailabilityQuery { source }
    })?;

    let map: AvailabilityMap = results.into_iter().collect();
    debug!(
        venue_id = venue.id,
        slots = map.len(),
        free = map.iter().filter(|(_, free)| *free).count(),
        "Availability refreshed"
    );
    Ok(map)
}

/// Submits the booking transaction and waits for its confirmation.
///
/// The payment is `hourly_rate * duration` computed in integer units. The
/// returned id comes from the confirmation's `VenueBooked` event.
pub async fn submit_booking(
    ledger: &dyn LedgerClient,
    account: &Address,
    venue: &Venue,
    start: i64,
    duration: BookingDuration,
) -> Result<BookingId, ReconcilerError> {
    let request = pricing::booking_request(venue, start, duration)?;

    info!(
        venue_id = request.venue_id,
        start = request.start,
        hours = request.duration.hours(),
        payment = %request.total_price,
        account = %account.truncated(),
        "Submitting booking"
    );

    let tx = ledger
        .book_venue(
            account,
            request.venue_id,
            request.start,
            request.duration,
            request.total_price,
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "Booking submission failed");
            ReconcilerError::booking_failed(&e)
        })?;

    let receipt = ledger.wait(tx).await.map_err(|e| {
        warn!(tx = tx.0, error = %e, "Booking transaction failed");
        ReconcilerError::booking_failed(&e)
    })?;

    let booking_id = receipt.booking_id().ok_or_else(|| {
        warn!(tx = tx.0, "Booking confirmed without a VenueBooked event");
        ReconcilerError::BookingSubmission {
            reason: error::BOOKING_FAILED_MESSAGE.to_string(),
        }
    })?;

    info!(booking_id, tx = tx.0, "Booking confirmed");
    Ok(booking_id)
}
