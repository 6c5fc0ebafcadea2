//! Ledger capability.
//!
//! The ledger is the service of record for venues, bookings and payments.
//! Everything in this crate reaches it through [`LedgerClient`], handed in
//! explicitly as an `Arc<dyn LedgerClient>`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    amount, Address, Amount, Booking, BookingDuration, BookingId, NewVenue, Venue, VenueId,
};

pub mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::{LedgerSeed, MemoryLedger, SeedError};

pub type SharedLedger = Arc<dyn LedgerClient>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction rejected: {reason}")]
    Rejected { reason: String },

    #[error("user rejected the signing request")]
    UserRejected,

    #[error("{0} not found")]
    NotFound(String),

    #[error("ledger transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        LedgerError::Rejected {
            reason: reason.into(),
        }
    }

    /// Message the ledger supplied for a failed transaction, if any.
    pub fn reason(&self) -> Option<String> {
        match self {
            LedgerError::Rejected { reason } if !reason.trim().is_empty() => Some(reason.clone()),
            LedgerError::Rejected { .. } | LedgerError::Transport(_) => None,
            LedgerError::UserRejected | LedgerError::NotFound(_) => Some(self.to_string()),
        }
    }
}

/// Handle for a submitted, not yet confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TxHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    VenueRegistered {
        venue_id: VenueId,
        owner: Address,
    },
    VenueBooked {
        booking_id: BookingId,
        venue_id: VenueId,
        time_slot: i64,
        duration: BookingDuration,
        booker: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
    BookingCancelled {
        booking_id: BookingId,
    },
    PaymentWithdrawn {
        owner: Address,
        #[serde(with = "amount::as_string")]
        amount: Amount,
    },
}

/// Confirmation of a mined transaction and the events it emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx: TxHandle,
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    pub fn booking_id(&self) -> Option<BookingId> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::VenueBooked { booking_id, .. } => Some(*booking_id),
            _ => None,
        })
    }

    pub fn venue_id(&self) -> Option<VenueId> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::VenueRegistered { venue_id, .. } => Some(*venue_id),
            _ => None,
        })
    }

    pub fn withdrawn(&self) -> Option<Amount> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::PaymentWithdrawn { amount, .. } => Some(*amount),
            _ => None,
        })
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn venue_ids(&self) -> Result<Vec<VenueId>, LedgerError>;

    async fn venue(&self, venue_id: VenueId) -> Result<Venue, LedgerError>;

    async fn check_availability(&self, venue_id: VenueId, timestamp: i64)
        -> Result<bool, LedgerError>;

    /// `payment` must equal `hourly_rate * duration` or the ledger rejects it.
    async fn book_venue(
        &self,
        from: &Address,
        venue_id: VenueId,
        timestamp: i64,
        duration: BookingDuration,
        payment: Amount,
    ) -> Result<TxHandle, LedgerError>;

    async fn register_venue(&self, from: &Address, venue: NewVenue)
        -> Result<TxHandle, LedgerError>;

    async fn cancel_booking(&self, from: &Address, booking_id: BookingId)
        -> Result<TxHandle, LedgerError>;

    async fn withdraw_payment(&self, from: &Address) -> Result<TxHandle, LedgerError>;

    /// Waits for the transaction to be mined. Reverted transactions fail here.
    async fn wait(&self, tx: TxHandle) -> Result<Receipt, LedgerError>;

    async fn booking(&self, booking_id: BookingId) -> Result<Booking, LedgerError>;

    async fn user_bookings(&self, account: &Address) -> Result<Vec<BookingId>, LedgerError>;

    /// Spendable balance of `account` in the smallest unit.
    async fn balance(&self, account: &Address) -> Result<Amount, LedgerError>;
}
