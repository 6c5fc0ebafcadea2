use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::parse_address;
use crate::models::{amount, Address, Amount, BookingId};
use crate::reconciler::format_ether;
use crate::state::SharedState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};
use crate::venues;

#[derive(Deserialize)]
pub struct CancelBookingRequest {
    pub account: Address,
}

#[derive(Serialize)]
struct AccountBalance {
    account: Address,
    #[serde(with = "amount::as_string")]
    balance: Amount,
    balance_display: String,
}

#[derive(Serialize)]
struct Withdrawal {
    #[serde(with = "amount::as_string")]
    amount: Amount,
    amount_display: String,
}

pub async fn user_bookings(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Response, AppError> {
    let account = parse_address(&address)?;
    let bookings = venues::user_bookings(state.ledger.as_ref(), &account).await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn balance(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Response, AppError> {
    let account = parse_address(&address)?;
    let balance = venues::account_balance(state.ledger.as_ref(), &account).await?;
    Ok(success(
        AccountBalance {
            account,
            balance,
            balance_display: format_ether(balance),
        },
        "Balance retrieved",
    ))
}

pub async fn withdraw_payment(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Response, AppError> {
    let owner = parse_address(&address)?;
    let amount = venues::withdraw_payment(state.ledger.as_ref(), &owner).await?;
    Ok(success(
        Withdrawal {
            amount,
            amount_display: format_ether(amount),
        },
        "Earnings withdrawn",
    ))
}

pub async fn cancel_booking(
    State(state): State<SharedState>,
    Path(booking_id): Path<BookingId>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Response, AppError> {
    venues::cancel_booking(state.ledger.as_ref(), &request.account, booking_id).await?;
    Ok(empty_success(format!("Booking {} cancelled", booking_id)))
}
