//! Venue and booking reads/writes outside the booking calendar.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ledger::{LedgerClient, LedgerError};
use crate::models::{amount, Address, Amount, Booking, BookingId, NewVenue, Venue, VenueId};
use crate::reconciler::format_ether;

#[derive(Debug, Clone, Serialize)]
pub struct VenueSummary {
    #[serde(flatten)]
    pub venue: Venue,
    pub hourly_rate_display: String,
}

impl From<Venue> for VenueSummary {
    fn from(venue: Venue) -> Self {
        let hourly_rate_display = format_ether(venue.hourly_rate);
        Self {
            venue,
            hourly_rate_display,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingWithVenue {
    #[serde(flatten)]
    pub booking: Booking,
    pub venue: VenueSummary,
}

/// Listing filters. Text terms match case-insensitively as substrings; blank
/// terms are ignored. Rate bounds are inclusive and in wei.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueFilter {
    pub sport_type: Option<String>,
    pub search: Option<String>,
    #[serde(default, with = "amount::option_as_string")]
    pub min_rate: Option<Amount>,
    #[serde(default, with = "amount::option_as_string")]
    pub max_rate: Option<Amount>,
}

impl VenueFilter {
    pub fn matches(&self, venue: &Venue) -> bool {
        if let Some(sport) = term(&self.sport_type) {
            if !contains_ignore_case(&venue.sport_type, sport) {
                return false;
            }
        }
        if let Some(search) = term(&self.search) {
            if !contains_ignore_case(&venue.name, search)
                && !contains_ignore_case(&venue.sport_type, search)
            {
                return false;
            }
        }
        self.min_rate.map_or(true, |min| venue.hourly_rate >= min)
            && self.max_rate.map_or(true, |max| venue.hourly_rate <= max)
    }
}

fn term(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub async fn list_venues(
    ledger: &dyn LedgerClient,
    filter: &VenueFilter,
) -> Result<Vec<Venue>, LedgerError> {
    let ids = ledger.venue_ids().await?;
    let venues = try_join_all(ids.into_iter().map(|id| ledger.venue(id)))
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to load venues");
            e
        })?;

    let total = venues.len();
    let venues: Vec<Venue> = venues.into_iter().filter(|v| filter.matches(v)).collect();
    debug!(total, matched = venues.len(), "Venues listed");
    Ok(venues)
}

pub async fn venue_details(ledger: &dyn LedgerClient, venue_id: VenueId) -> Result<Venue, LedgerError> {
    ledger.venue(venue_id).await
}

pub async fn register_venue(
    ledger: &dyn LedgerClient,
    owner: &Address,
    venue: NewVenue,
) -> Result<VenueId, LedgerError> {
    let tx = ledger.register_venue(owner, venue).await?;
    let receipt = ledger.wait(tx).await?;
    let venue_id = receipt
        .venue_id()
        .ok_or_else(|| LedgerError::Transport("missing VenueRegistered event".into()))?;

    info!(venue_id, owner = %owner.truncated(), "Venue registered");
    Ok(venue_id)
}

/// Bookings made by `account`, each joined with its venue.
pub async fn user_bookings(
    ledger: &dyn LedgerClient,
    account: &Address,
) -> Result<Vec<BookingWithVenue>, LedgerError> {
    let ids = ledger.user_bookings(account).await?;
    let bookings = try_join_all(ids.into_iter().map(|id| ledger.booking(id))).await?;

    let mut venue_ids: Vec<VenueId> = bookings.iter().map(|b| b.venue_id).collect();
    venue_ids.sort_unstable();
    venue_ids.dedup();
    let venues = try_join_all(venue_ids.into_iter().map(|id| ledger.venue(id))).await?;

    bookings
        .into_iter()
        .map(|booking| {
            let venue = venues
                .iter()
                .find(|v| v.id == booking.venue_id)
                .cloned()
                .ok_or_else(|| LedgerError::NotFound(format!("venue {}", booking.venue_id)))?;
            Ok(BookingWithVenue {
                booking,
                venue: venue.into(),
            })
        })
        .collect()
}

pub async fn cancel_booking(
    ledger: &dyn LedgerClient,
    account: &Address,
    booking_id: BookingId,
) -> Result<(), LedgerError> {
    let tx = ledger.cancel_booking(account, booking_id).await?;
    ledger.wait(tx).await?;
    info!(booking_id, account = %account.truncated(), "Booking cancelled");
    Ok(())
}

pub async fn account_balance(
    ledger: &dyn LedgerClient,
    account: &Address,
) -> Result<Amount, LedgerError> {
    ledger.balance(account).await
}

/// Pays out the owner's accrued earnings and returns the amount.
pub async fn withdraw_payment(
    ledger: &dyn LedgerClient,
    owner: &Address,
) -> Result<Amount, LedgerError> {
    let tx = ledger.withdraw_payment(owner).await?;
    let receipt = ledger.wait(tx).await?;
    let amount = receipt.withdrawn().unwrap_or(0);
    info!(owner = %owner.truncated(), amount = %amount, "Earnings withdrawn");
    Ok(amount)
}
