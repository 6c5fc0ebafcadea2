//! In-process ledger.
//!
//! Enforces the rules the booking flow depends on: exact payment, one
//! booking per venue-hour, booker-only cancellation and owner withdrawals.
//! Transactions are queued on submission and applied when awaited, so two
//! submissions racing for the same slot resolve in confirmation order.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::{LedgerClient, LedgerError, LedgerEvent, Receipt, TxHandle};
use crate::models::{
    amount, Address, Amount, Booking, BookingDuration, BookingId, NewVenue, Venue, VenueId,
};

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedVenue {
    #[serde(flatten)]
    pub venue: NewVenue,
    pub owner: Address,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerSeed {
    #[serde(default)]
    pub venues: Vec<SeedVenue>,
    #[serde(default)]
    pub balances: BTreeMap<Address, SeedAmount>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct SeedAmount(#[serde(with = "amount::as_string")] pub Amount);

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LedgerSeed {
    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
enum PendingTx {
    Book {
        from: Address,
        venue_id: VenueId,
        timestamp: i64,
        duration: BookingDuration,
        payment: Amount,
    },
    Register {
        from: Address,
        venue: NewVenue,
    },
    Cancel {
        from: Address,
        booking_id: BookingId,
    },
    Withdraw {
        from: Address,
    },
}

#[derive(Default)]
struct LedgerState {
    venues: BTreeMap<VenueId, Venue>,
    bookings: BTreeMap<BookingId, Booking>,
    /// (venue, hour start) -> booking holding it.
    taken: HashMap<(VenueId, i64), BookingId>,
    user_bookings: HashMap<Address, Vec<BookingId>>,
    balances: HashMap<Address, Amount>,
    earnings: HashMap<Address, Amount>,
    pending: HashMap<TxHandle, PendingTx>,
    next_tx: u64,
    signing_declined: bool,
}

impl LedgerState {
    fn next_venue_id(&self) -> VenueId {
        self.venues.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_booking_id(&self) -> BookingId {
        self.bookings.keys().next_back().map_or(1, |id| id + 1)
    }

    fn insert_venue(&mut self, venue: NewVenue, owner: Address, is_active: bool) -> VenueId {
        let id = self.next_venue_id();
        self.venues.insert(
            id,
            Venue {
                id,
                name: venue.name,
                sport_type: venue.sport_type,
                hourly_rate: venue.hourly_rate,
                latitude: venue.latitude,
                longitude: venue.longitude,
                owner,
                is_active,
            },
        );
        id
    }

    fn queue(&mut self, tx: PendingTx) -> Result<TxHandle, LedgerError> {
        if self.signing_declined {
            return Err(LedgerError::UserRejected);
        }
        self.next_tx += 1;
        let handle = TxHandle(self.next_tx);
        self.pending.insert(handle, tx);
        Ok(handle)
    }

    fn apply(&mut self, tx: PendingTx) -> Result<Vec<LedgerEvent>, LedgerError> {
        match tx {
            PendingTx::Book {
                from,
                venue_id,
                timestamp,
                duration,
                payment,
            } => self.apply_booking(from, venue_id, timestamp, duration, payment),
            PendingTx::Register { from, venue } => {
                venue
                    .validate()
                    .map_err(|e| LedgerError::rejected(e.to_string()))?;
                let venue_id = self.insert_venue(venue, from.clone(), true);
                Ok(vec![LedgerEvent::VenueRegistered {
                    venue_id,
                    owner: from,
                }])
            }
            PendingTx::Cancel { from, booking_id } => self.apply_cancel(from, booking_id),
            PendingTx::Withdraw { from } => {
                let amount = self.earnings.remove(&from).unwrap_or(0);
                if amount == 0 {
                    return Err(LedgerError::rejected("No earnings to withdraw"));
                }
                *self.balances.entry(from.clone()).or_default() += amount;
                Ok(vec![LedgerEvent::PaymentWithdrawn {
                    owner: from,
                    amount,
                }])
            }
        }
    }

    fn apply_booking(
        &mut self,
        from: Address,
        venue_id: VenueId,
        timestamp: i64,
        duration: BookingDuration,
        payment: Amount,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let venue = self
            .venues
            .get(&venue_id)
            .ok_or_else(|| LedgerError::rejected("Venue does not exist"))?;
        if !venue.is_active {
            return Err(LedgerError::rejected("Venue is not active"));
        }
        if timestamp % SECONDS_PER_HOUR != 0 {
            return Err(LedgerError::rejected("Time slot must start on the hour"));
        }

        let expected = venue
            .hourly_rate
            .checked_mul(Amount::from(duration.hours()))
            .ok_or_else(|| LedgerError::rejected("Incorrect payment amount"))?;
        if payment != expected {
            return Err(LedgerError::rejected("Incorrect payment amount"));
        }

        let hours: Vec<i64> = (0..i64::from(duration.hours()))
            .map(|h| timestamp + h * SECONDS_PER_HOUR)
            .collect();
        if hours.iter().any(|hour| self.taken.contains_key(&(venue_id, *hour))) {
            return Err(LedgerError::rejected("Time slot not available"));
        }

        let balance = self.balances.get(&from).copied().unwrap_or(0);
        if balance < payment {
            return Err(LedgerError::rejected("insufficient funds"));
        }

        let owner = venue.owner.clone();
        let booking_id = self.next_booking_id();
        self.balances.insert(from.clone(), balance - payment);
        *self.earnings.entry(owner).or_default() += payment;
        for hour in hours {
            self.taken.insert((venue_id, hour), booking_id);
        }
        self.bookings.insert(
            booking_id,
            Booking {
                id: booking_id,
                venue_id,
                time_slot: timestamp,
                duration,
                booker: from.clone(),
                is_cancelled: false,
            },
        );
        self.user_bookings
            .entry(from.clone())
            .or_default()
            .push(booking_id);

        Ok(vec![LedgerEvent::VenueBooked {
            booking_id,
            venue_id,
            time_slot: timestamp,
            duration,
            booker: from,
            amount: payment,
        }])
    }

    fn apply_cancel(
        &mut self,
        from: Address,
        booking_id: BookingId,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| LedgerError::rejected("Booking does not exist"))?;
        if booking.booker != from {
            return Err(LedgerError::rejected("Only the booker can cancel"));
        }
        if booking.is_cancelled {
            return Err(LedgerError::rejected("Booking already cancelled"));
        }

        booking.is_cancelled = true;
        let venue_id = booking.venue_id;
        let start = booking.time_slot;
        for h in 0..i64::from(booking.duration.hours()) {
            self.taken.remove(&(venue_id, start + h * SECONDS_PER_HOUR));
        }

        Ok(vec![LedgerEvent::BookingCancelled { booking_id }])
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: LedgerSeed) -> Self {
        let ledger = Self::new();
        {
            let mut state = ledger.lock();
            for entry in seed.venues {
                state.insert_venue(entry.venue, entry.owner, entry.is_active);
            }
            for (address, SeedAmount(amount)) in seed.balances {
                state.balances.insert(address, amount);
            }
            info!(
                venues = state.venues.len(),
                accounts = state.balances.len(),
                "Seeded in-memory ledger"
            );
        }
        ledger
    }

    pub fn fund(&self, account: &Address, amount: Amount) {
        *self.lock().balances.entry(account.clone()).or_default() += amount;
    }

    pub fn earnings(&self, account: &Address) -> Amount {
        self.lock().earnings.get(account).copied().unwrap_or(0)
    }

    pub fn set_active(&self, venue_id: VenueId, is_active: bool) -> Result<(), LedgerError> {
        let mut state = self.lock();
        let venue = state
            .venues
            .get_mut(&venue_id)
            .ok_or_else(|| LedgerError::NotFound(format!("venue {}", venue_id)))?;
        venue.is_active = is_active;
        Ok(())
    }

    /// Makes every subsequent submission fail as if the wallet declined to sign.
    pub fn decline_signatures(&self, declined: bool) {
        self.lock().signing_declined = declined;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn venue_ids(&self) -> Result<Vec<VenueId>, LedgerError> {
        Ok(self.lock().venues.keys().copied().collect())
    }

    async fn venue(&self, venue_id: VenueId) -> Result<Venue, LedgerError> {
        self.lock()
            .venues
            .get(&venue_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("venue {}", venue_id)))
    }

    async fn check_availability(
        &self,
        venue_id: VenueId,
        timestamp: i64,
    ) -> Result<bool, LedgerError> {
        let state = self.lock();
        if !state.venues.contains_key(&venue_id) {
            return Err(LedgerError::NotFound(format!("venue {}", venue_id)));
        }
        Ok(!state.taken.contains_key(&(venue_id, timestamp)))
    }

    async fn book_venue(
        &self,
        from: &Address,
        venue_id: VenueId,
        timestamp: i64,
        duration: BookingDuration,
        payment: Amount,
    ) -> Result<TxHandle, LedgerError> {
        self.lock().queue(PendingTx::Book {
            from: from.clone(),
            venue_id,
            timestamp,
            duration,
            payment,
        })
    }

    async fn register_venue(
        &self,
        from: &Address,
        venue: NewVenue,
    ) -> Result<TxHandle, LedgerError> {
        self.lock().queue(PendingTx::Register {
            from: from.clone(),
            venue,
        })
    }

    async fn cancel_booking(
        &self,
        from: &Address,
        booking_id: BookingId,
    ) -> Result<TxHandle, LedgerError> {
        self.lock().queue(PendingTx::Cancel {
            from: from.clone(),
            booking_id,
        })
    }

    async fn withdraw_payment(&self, from: &Address) -> Result<TxHandle, LedgerError> {
        self.lock().queue(PendingTx::Withdraw { from: from.clone() })
    }

    async fn wait(&self, tx: TxHandle) -> Result<Receipt, LedgerError> {
        let mut state = self.lock();
        let pending = state
            .pending
            .remove(&tx)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", tx.0)))?;
        let events = state.apply(pending)?;
        debug!(tx = tx.0, events = events.len(), "Transaction confirmed");
        Ok(Receipt { tx, events })
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Booking, LedgerError> {
        self.lock()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("booking {}", booking_id)))
    }

    async fn user_bookings(&self, account: &Address) -> Result<Vec<BookingId>, LedgerError> {
        Ok(self
            .lock()
            .user_bookings
            .get(account)
            .cloned()
            .unwrap_or_default())
    }

    async fn balance(&self, account: &Address) -> Result<Amount, LedgerError> {
        Ok(self.lock().balances.get(account).copied().unwrap_or(0))
    }
}
