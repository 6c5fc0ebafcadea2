//! Booking-screen endpoints. Each maps one UI event (open, pick date, pick
//! slot, change duration, book) onto a [`BookingCalendar`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Address, BookingId, VenueId};
use crate::reconciler::slots::today_in;
use crate::reconciler::{upcoming_dates, BookingCalendar, CalendarView, RefreshOutcome};
use crate::state::SharedState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::venues;
use crate::wallet::WalletSession;

#[derive(Deserialize)]
pub struct OpenCalendarRequest {
    pub venue_id: VenueId,
    pub date: Option<NaiveDate>,
    pub account: Option<Address>,
    pub duration: Option<u8>,
}

#[derive(Deserialize)]
pub struct SelectDateRequest {
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct SetDurationRequest {
    pub hours: u8,
}

#[derive(Deserialize)]
pub struct SelectSlotRequest {
    /// `null` clears the selection.
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
pub struct SetAccountRequest {
    /// `null` disconnects.
    pub account: Option<Address>,
}

#[derive(Serialize)]
struct CalendarResponse {
    id: Uuid,
    #[serde(flatten)]
    view: CalendarView,
}

#[derive(Serialize)]
struct BookingConfirmation {
    booking_id: BookingId,
    calendar: CalendarResponse,
}

fn calendar_response(id: Uuid, calendar: &BookingCalendar) -> CalendarResponse {
    CalendarResponse {
        id,
        view: calendar.view(),
    }
}

fn refresh_message(outcome: &RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Applied(_) => "Availability updated",
        RefreshOutcome::Discarded => "A newer availability check is in progress",
    }
}

fn ensure_bookable_date(today: NaiveDate, date: NaiveDate) -> Result<(), AppError> {
    if upcoming_dates(today).contains(&date) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "{} is outside the booking window",
            date
        )))
    }
}

pub async fn open_calendar(
    State(state): State<SharedState>,
    Json(request): Json<OpenCalendarRequest>,
) -> Result<Response, AppError> {
    let venue = venues::venue_details(state.ledger.as_ref(), request.venue_id).await?;
    let today = today_in(&state.timezone);
    if let Some(date) = request.date {
        ensure_bookable_date(today, date)?;
    }

    let calendar = BookingCalendar::new(
        state.ledger.clone(),
        WalletSession::new(request.account),
        state.timezone,
        venue,
        today,
    );
    if let Some(hours) = request.duration {
        calendar.set_duration(hours)?;
    }

    match request.date {
        Some(date) => calendar.select_date(date).await?,
        None => calendar.refresh().await?,
    };
    calendar.refresh_balance().await;

    let calendar = Arc::new(calendar);
    let id = state.insert_calendar(calendar.clone());
    tracing::info!(calendar_id = %id, venue_id = request.venue_id, "Calendar opened");

    Ok(created(calendar_response(id, &calendar), "Calendar opened"))
}

pub async fn get_calendar(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    Ok(success(calendar_response(id, &calendar), "Calendar retrieved"))
}

pub async fn close_calendar(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    state
        .remove_calendar(id)
        .ok_or_else(|| AppError::NotFound(format!("Calendar '{}' was not found", id)))?;
    Ok(empty_success("Calendar closed"))
}

pub async fn select_date(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectDateRequest>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    ensure_bookable_date(calendar.today(), request.date)?;

    let outcome = calendar.select_date(request.date).await?;
    Ok(success(calendar_response(id, &calendar), refresh_message(&outcome)))
}

pub async fn set_duration(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetDurationRequest>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    calendar.set_duration(request.hours)?;
    Ok(success(calendar_response(id, &calendar), "Duration updated"))
}

pub async fn select_slot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectSlotRequest>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    match request.timestamp {
        Some(timestamp) => {
            calendar.select_slot(timestamp)?;
        }
        None => calendar.clear_selection(),
    }
    Ok(success(calendar_response(id, &calendar), "Selection updated"))
}

pub async fn set_account(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetAccountRequest>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    match request.account {
        Some(account) => calendar.wallet().connect(account),
        None => calendar.wallet().disconnect(),
    }
    calendar.refresh_balance().await;
    Ok(success(calendar_response(id, &calendar), "Account updated"))
}

pub async fn refresh(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    let outcome = calendar.refresh().await?;
    Ok(success(calendar_response(id, &calendar), refresh_message(&outcome)))
}

pub async fn book(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let calendar = state.calendar(id)?;
    let booking_id = calendar.submit().await?;

    Ok(success(
        BookingConfirmation {
            booking_id,
            calendar: calendar_response(id, &calendar),
        },
        "Booking confirmed",
    ))
}
