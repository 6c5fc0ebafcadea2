//! Stateful booking flow for one venue.
//!
//! Holds the selected day, slot grid, selection and duration, and walks a
//! single booking attempt through `Idle -> Submitting -> {Confirmed, Failed}
//! -> Idle`. Availability is published as a whole snapshot; every refresh is
//! tagged with a generation and only the newest one may publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwapOption;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::availability::{is_contiguous_block_free, AvailabilityMap};
use super::pricing::{format_ether, total_price};
use super::slots::{generate_slots, today_in, upcoming_dates};
use super::{refresh_availability, submit_booking, ReconcilerError};
use crate::ledger::{LedgerClient, SharedLedger};
use crate::models::{Address, Amount, BookingDuration, BookingId, TimeSlot, Venue, VenueId};
use crate::wallet::WalletSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BookingState {
    Idle,
    Submitting,
    Confirmed { booking_id: BookingId },
    Failed { reason: String },
}

/// Availability for one venue/day, produced by a single refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    pub generation: u64,
    pub venue_id: VenueId,
    pub date: NaiveDate,
    pub map: AvailabilityMap,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Applied(Arc<AvailabilitySnapshot>),
    /// A newer refresh was requested before this one resolved.
    Discarded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub label: String,
    pub timestamp: i64,
    pub free: bool,
    pub bookable: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub venue: Venue,
    pub date: NaiveDate,
    pub upcoming_dates: Vec<NaiveDate>,
    pub duration: BookingDuration,
    pub availability_loaded: bool,
    pub slots: Vec<SlotView>,
    pub selected: Option<i64>,
    /// Exact payment in wei; `None` only on overflow.
    pub total_price: Option<String>,
    pub hourly_rate_display: String,
    pub total_price_display: Option<String>,
    pub account: Option<Address>,
    /// Last balance read for the connected account, in wei.
    pub balance: Option<String>,
    pub balance_display: Option<String>,
    pub booking: BookingState,
    pub last_error: Option<String>,
    pub last_booking: Option<BookingId>,
}

struct CalendarState {
    venue: Venue,
    date: NaiveDate,
    slots: Vec<TimeSlot>,
    selected: Option<TimeSlot>,
    duration: BookingDuration,
    booking: BookingState,
    last_error: Option<String>,
    last_booking: Option<BookingId>,
    balance: Option<(Address, Amount)>,
}

impl CalendarState {
    fn transition(&mut self, next: BookingState) {
        debug!(venue_id = self.venue.id, from = ?self.booking, to = ?next, "Booking state");
        self.booking = next;
    }
}

pub struct BookingCalendar {
    ledger: SharedLedger,
    wallet: WalletSession,
    tz: Tz,
    state: Mutex<CalendarState>,
    availability: ArcSwapOption<AvailabilitySnapshot>,
    generation: AtomicU64,
}

impl BookingCalendar {
    pub fn new(
        ledger: SharedLedger,
        wallet: WalletSession,
        tz: Tz,
        venue: Venue,
        date: NaiveDate,
    ) -> Self {
        let slots = generate_slots(date, &tz);
        Self {
            ledger,
            wallet,
            tz,
            state: Mutex::new(CalendarState {
                venue,
                date,
                slots,
                selected: None,
                duration: BookingDuration::default(),
                booking: BookingState::Idle,
                last_error: None,
                last_booking: None,
                balance: None,
            }),
            availability: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn wallet(&self) -> &WalletSession {
        &self.wallet
    }

    pub fn venue(&self) -> Venue {
        self.lock().venue.clone()
    }

    pub fn date(&self) -> NaiveDate {
        self.lock().date
    }

    /// Current day in the venue's zone.
    pub fn today(&self) -> NaiveDate {
        today_in(&self.tz)
    }

    pub fn slots(&self) -> Vec<TimeSlot> {
        self.lock().slots.clone()
    }

    pub fn selected(&self) -> Option<TimeSlot> {
        self.lock().selected.clone()
    }

    pub fn duration(&self) -> BookingDuration {
        self.lock().duration
    }

    pub fn booking_state(&self) -> BookingState {
        self.lock().booking.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Latest published snapshot, which may belong to a previous venue or day
    /// while a refresh is in flight.
    pub fn availability(&self) -> Option<Arc<AvailabilitySnapshot>> {
        self.availability.load_full()
    }

    pub async fn select_date(&self, date: NaiveDate) -> Result<RefreshOutcome, ReconcilerError> {
        {
            let mut state = self.lock();
            state.date = date;
            state.slots = generate_slots(date, &self.tz);
            state.selected = None;
        }
        self.refresh().await
    }

    pub async fn select_venue(&self, venue: Venue) -> Result<RefreshOutcome, ReconcilerError> {
        {
            let mut state = self.lock();
            state.venue = venue;
            state.selected = None;
        }
        self.refresh().await
    }

    /// Selects the slot starting at `timestamp` if the block for the current
    /// duration is free in the published availability.
    pub fn select_slot(&self, timestamp: i64) -> Result<TimeSlot, ReconcilerError> {
        let mut state = self.lock();
        let slot = state
            .slots
            .iter()
            .find(|slot| slot.timestamp == timestamp)
            .cloned()
            .ok_or_else(|| ReconcilerError::invalid_selection("Unknown time slot"))?;

        if !self.block_is_free(&state, timestamp, state.duration) {
            return Err(ReconcilerError::invalid_selection(
                "The selected time slot is not available for the chosen duration",
            ));
        }

        state.selected = Some(slot.clone());
        Ok(slot)
    }

    pub fn clear_selection(&self) {
        self.lock().selected = None;
    }

    /// Changes the duration. The selection is kept; submission re-checks it.
    pub fn set_duration(&self, hours: u8) -> Result<BookingDuration, ReconcilerError> {
        let duration = BookingDuration::new(hours)
            .map_err(|e| ReconcilerError::InvalidSelection(e.to_string()))?;
        self.lock().duration = duration;
        Ok(duration)
    }

    /// Rebuilds the availability map for the current venue and day.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ReconcilerError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (venue, date, slots) = {
            let state = self.lock();
            (state.venue.clone(), state.date, state.slots.clone())
        };

        let result = refresh_availability(self.ledger.as_ref(), &venue, &slots).await;

        // Publishing happens under the state lock so a check-then-store cannot
        // interleave with a newer refresh.
        let _state = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, venue_id = venue.id, %date, "Discarding stale availability");
            return Ok(RefreshOutcome::Discarded);
        }

        let snapshot = Arc::new(AvailabilitySnapshot {
            generation,
            venue_id: venue.id,
            date,
            map: result?,
        });
        self.availability.store(Some(snapshot.clone()));
        Ok(RefreshOutcome::Applied(snapshot))
    }

    /// Reads the connected account's balance. Returns `None` when no account is
    /// connected or the ledger could not be reached.
    pub async fn refresh_balance(&self) -> Option<Amount> {
        let Some(account) = self.wallet.account() else {
            self.lock().balance = None;
            return None;
        };

        match self.ledger.balance(&account).await {
            Ok(amount) => {
                self.lock().balance = Some((account, amount));
                Some(amount)
            }
            Err(e) => {
                warn!(account = %account.truncated(), error = %e, "Balance refresh failed");
                None
            }
        }
    }

    /// Books the selected block for the connected account.
    ///
    /// On confirmation the selection is cleared and availability refreshed.
    /// On failure the selection stays and the error is kept for display.
    pub async fn submit(&self) -> Result<BookingId, ReconcilerError> {
        let (account, venue, start, duration) = {
            let mut state = self.lock();
            let account = self.wallet.account();
            let (Some(account), Some(slot)) = (account, state.selected.clone()) else {
                return Err(ReconcilerError::invalid_selection(
                    "Please connect your wallet and select a time slot.",
                ));
            };
            if state.booking == BookingState::Submitting {
                return Err(ReconcilerError::invalid_selection(
                    "A booking is already being submitted",
                ));
            }
            if !self.block_is_free(&state, slot.timestamp, state.duration) {
                return Err(ReconcilerError::invalid_selection(
                    "The selected time slot is no longer available",
                ));
            }

            state.transition(BookingState::Submitting);
            state.last_error = None;
            (account, state.venue.clone(), slot.timestamp, state.duration)
        };

        match submit_booking(self.ledger.as_ref(), &account, &venue, start, duration).await {
            Ok(booking_id) => {
                {
                    let mut state = self.lock();
                    state.transition(BookingState::Confirmed { booking_id });
                    state.selected = None;
                    state.last_booking = Some(booking_id);
                }
                if let Err(e) = self.refresh().await {
                    warn!(booking_id, error = %e, "Availability refresh after booking failed");
                }
                self.refresh_balance().await;
                self.lock().transition(BookingState::Idle);
                Ok(booking_id)
            }
            Err(e) => {
                let mut state = self.lock();
                let reason = e.to_string();
                state.transition(BookingState::Failed {
                    reason: reason.clone(),
                });
                info!(venue_id = venue.id, %reason, "Booking failed; selection kept");
                state.last_error = Some(reason);
                state.transition(BookingState::Idle);
                Err(e)
            }
        }
    }

    pub fn view(&self) -> CalendarView {
        self.view_on(self.today())
    }

    /// Renders the calendar with the booking window starting at `today`.
    pub fn view_on(&self, today: NaiveDate) -> CalendarView {
        let state = self.lock();
        let snapshot = self.current_snapshot(&state);
        let selected = state.selected.as_ref().map(|slot| slot.timestamp);

        let slots = state
            .slots
            .iter()
            .map(|slot| {
                let (free, bookable) = match &snapshot {
                    Some(snapshot) => (
                        snapshot.map.is_free(slot.timestamp),
                        is_contiguous_block_free(
                            slot.timestamp,
                            state.duration,
                            &state.slots,
                            &snapshot.map,
                        ),
                    ),
                    None => (false, false),
                };
                SlotView {
                    label: slot.label.clone(),
                    timestamp: slot.timestamp,
                    free,
                    bookable,
                    selected: selected == Some(slot.timestamp),
                }
            })
            .collect();

        let total = total_price(state.venue.hourly_rate, state.duration);
        let account = self.wallet.account();
        let balance = state
            .balance
            .as_ref()
            .filter(|(owner, _)| Some(owner) == account.as_ref())
            .map(|(_, amount)| *amount);

        CalendarView {
            venue: state.venue.clone(),
            date: state.date,
            upcoming_dates: upcoming_dates(today),
            duration: state.duration,
            availability_loaded: snapshot.is_some(),
            slots,
            selected,
            total_price: total.map(|wei| wei.to_string()),
            hourly_rate_display: format_ether(state.venue.hourly_rate),
            total_price_display: total.map(format_ether),
            account,
            balance: balance.map(|wei| wei.to_string()),
            balance_display: balance.map(format_ether),
            booking: state.booking.clone(),
            last_error: state.last_error.clone(),
            last_booking: state.last_booking,
        }
    }

    /// The published snapshot if it matches the current venue and day.
    fn current_snapshot(&self, state: &CalendarState) -> Option<Arc<AvailabilitySnapshot>> {
        self.availability
            .load_full()
            .filter(|snapshot| snapshot.venue_id == state.venue.id && snapshot.date == state.date)
    }

    fn block_is_free(&self, state: &CalendarState, start: i64, duration: BookingDuration) -> bool {
        self.current_snapshot(state).is_some_and(|snapshot| {
            is_contiguous_block_free(start, duration, &state.slots, &snapshot.map)
        })
    }

    fn lock(&self) -> MutexGuard<'_, CalendarState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
