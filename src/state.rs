use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::ledger::SharedLedger;
use crate::reconciler::BookingCalendar;
use crate::utils::error::AppError;

pub type SharedState = Arc<AppState>;

struct OpenCalendar {
    calendar: Arc<BookingCalendar>,
    last_touched: Instant,
}

/// Shared handler state: the ledger capability plus one booking calendar per
/// open booking screen.
pub struct AppState {
    pub ledger: SharedLedger,
    pub timezone: Tz,
    calendar_idle: Duration,
    calendars: RwLock<HashMap<Uuid, OpenCalendar>>,
}

impl AppState {
    pub fn new(ledger: SharedLedger, timezone: Tz, calendar_idle: Duration) -> Self {
        Self {
            ledger,
            timezone,
            calendar_idle,
            calendars: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert_calendar(&self, calendar: Arc<BookingCalendar>) -> Uuid {
        let now = Instant::now();
        self.evict_idle(now);

        let id = Uuid::new_v4();
        self.calendars
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                id,
                OpenCalendar {
                    calendar,
                    last_touched: now,
                },
            );
        id
    }

    /// Looks up a calendar and marks it as in use.
    pub fn calendar(&self, id: Uuid) -> Result<Arc<BookingCalendar>, AppError> {
        let mut calendars = self
            .calendars
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let open = calendars
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Calendar '{}' was not found", id)))?;
        open.last_touched = Instant::now();
        Ok(open.calendar.clone())
    }

    pub fn remove_calendar(&self, id: Uuid) -> Option<Arc<BookingCalendar>> {
        self.calendars
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id)
            .map(|open| open.calendar)
    }

    pub fn calendar_count(&self) -> usize {
        self.calendars
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Drops calendars not touched within the idle window as of `now`.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut calendars = self
            .calendars
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = calendars.len();
        calendars.retain(|_, open| now.saturating_duration_since(open.last_touched) < self.calendar_idle);

        let evicted = before - calendars.len();
        if evicted > 0 {
            tracing::info!(evicted, open = calendars.len(), "Evicted idle calendars");
        }
        evicted
    }
}

/// Periodically evicts idle calendars for the lifetime of the server.
pub fn spawn_calendar_sweeper(state: SharedState) -> JoinHandle<()> {
    let period = (state.calendar_idle / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.evict_idle(Instant::now());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::models::Venue;
    use crate::wallet::WalletSession;
    use chrono::NaiveDate;

    fn state(idle: Duration) -> AppState {
        AppState::new(Arc::new(MemoryLedger::new()), chrono_tz::UTC, idle)
    }

    fn calendar(state: &AppState) -> Arc<BookingCalendar> {
        let venue = Venue {
            id: 1,
            name: "Harbour Five-a-side".to_string(),
            sport_type: "Football".to_string(),
            hourly_rate: 10_000_000_000_000_000,
            latitude: "53.4808".to_string(),
            longitude: "-2.2426".to_string(),
            owner: "0x00000000000000000000000000000000000000a1".parse().unwrap(),
            is_active: true,
        };
        Arc::new(BookingCalendar::new(
            state.ledger.clone(),
            WalletSession::disconnected(),
            state.timezone,
            venue,
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
        ))
    }

    #[test]
    fn test_idle_calendars_are_evicted() {
        let idle = Duration::from_secs(60);
        let state = state(idle);
        let first = state.insert_calendar(calendar(&state));
        let second = state.insert_calendar(calendar(&state));
        let opened = Instant::now();

        assert_eq!(state.evict_idle(opened), 0);
        assert_eq!(state.calendar_count(), 2);

        std::thread::sleep(Duration::from_millis(5));
        state.calendar(first).unwrap();

        assert_eq!(state.evict_idle(opened + idle), 1);
        assert!(state.calendar(first).is_ok());
        assert!(matches!(state.calendar(second), Err(AppError::NotFound(_))));

        assert_eq!(state.evict_idle(Instant::now() + idle), 1);
        assert_eq!(state.calendar_count(), 0);
    }

    #[test]
    fn test_insert_sweeps_idle_calendars() {
        let state = state(Duration::from_millis(1));
        let stale = state.insert_calendar(calendar(&state));
        std::thread::sleep(Duration::from_millis(10));

        let fresh = state.insert_calendar(calendar(&state));
        assert_eq!(state.calendar_count(), 1);
        assert!(state.remove_calendar(stale).is_none());
        assert!(state.remove_calendar(fresh).is_some());
    }
}
