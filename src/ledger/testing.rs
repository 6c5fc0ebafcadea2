//! Ledger double for exercising failure and ordering paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{LedgerClient, LedgerError, MemoryLedger, Receipt, TxHandle};
use crate::models::{Address, Amount, Booking, BookingDuration, BookingId, NewVenue, Venue, VenueId};

pub(crate) struct ScriptedLedger {
    pub inner: MemoryLedger,
    failing: Mutex<HashSet<i64>>,
    gated: Mutex<HashSet<i64>>,
    gate: Arc<Semaphore>,
    pub availability_queries: AtomicUsize,
    pub submissions: AtomicUsize,
}

impl ScriptedLedger {
    pub fn new(inner: MemoryLedger) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            gated: Mutex::new(HashSet::new()),
            gate: Arc::new(Semaphore::new(0)),
            availability_queries: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        }
    }

    /// Availability queries for `timestamp` fail with a transport error.
    pub fn fail_at(&self, timestamp: i64) {
        self.failing.lock().unwrap().insert(timestamp);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Availability queries for these timestamps block until [`Self::release`].
    pub fn hold(&self, timestamps: impl IntoIterator<Item = i64>) {
        self.gated.lock().unwrap().extend(timestamps);
    }

    pub fn release(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn venue_ids(&self) -> Result<Vec<VenueId>, LedgerError> {
        self.inner.venue_ids().await
    }

    async fn venue(&self, venue_id: VenueId) -> Result<Venue, LedgerError> {
        self.inner.venue(venue_id).await
    }

    async fn check_availability(
        &self,
        venue_id: VenueId,
        timestamp: i64,
    ) -> Result<bool, LedgerError> {
        self.availability_queries.fetch_add(1, Ordering::SeqCst);
        let gated = self.gated.lock().unwrap().contains(&timestamp);
        if gated {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| LedgerError::Transport(e.to_string()))?;
        }
        let failing = self.failing.lock().unwrap().contains(&timestamp);
        if failing {
            return Err(LedgerError::Transport("rpc timeout".into()));
        }
        self.inner.check_availability(venue_id, timestamp).await
    }

    async fn book_venue(
        &self,
        from: &Address,
        venue_id: VenueId,
        timestamp: i64,
        duration: BookingDuration,
        payment: Amount,
    ) -> Result<TxHandle, LedgerError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.inner
            .book_venue(from, venue_id, timestamp, duration, payment)
            .await
    }

    async fn register_venue(
        &self,
        from: &Address,
        venue: NewVenue,
    ) -> Result<TxHandle, LedgerError> {
        self.inner.register_venue(from, venue).await
    }

    async fn cancel_booking(
        &self,
        from: &Address,
        booking_id: BookingId,
    ) -> Result<TxHandle, LedgerError> {
        self.inner.cancel_booking(from, booking_id).await
    }

    async fn withdraw_payment(&self, from: &Address) -> Result<TxHandle, LedgerError> {
        self.inner.withdraw_payment(from).await
    }

    async fn wait(&self, tx: TxHandle) -> Result<Receipt, LedgerError> {
        self.inner.wait(tx).await
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Booking, LedgerError> {
        self.inner.booking(booking_id).await
    }

    async fn user_bookings(&self, account: &Address) -> Result<Vec<BookingId>, LedgerError> {
        self.inner.user_bookings(account).await
    }

    async fn balance(&self, account: &Address) -> Result<Amount, LedgerError> {
        self.inner.balance(account).await
    }
}
