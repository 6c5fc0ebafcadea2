use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{accounts, calendars, health_check, venues};
use crate::state::SharedState;

pub fn create_routes(state: SharedState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/venues", get(venues::list_venues).post(venues::register_venue))
        .route("/venues/:id", get(venues::get_venue))
        .route("/accounts/:address/balance", get(accounts::balance))
        .route("/accounts/:address/bookings", get(accounts::user_bookings))
        .route("/accounts/:address/withdraw", post(accounts::withdraw_payment))
        .route("/bookings/:id/cancel", post(accounts::cancel_booking))
        .route("/calendars", post(calendars::open_calendar))
        .route(
            "/calendars/:id",
            get(calendars::get_calendar).delete(calendars::close_calendar),
        )
        .route("/calendars/:id/date", put(calendars::select_date))
        .route("/calendars/:id/duration", put(calendars::set_duration))
        .route("/calendars/:id/slot", put(calendars::select_slot))
        .route("/calendars/:id/account", put(calendars::set_account))
        .route("/calendars/:id/refresh", post(calendars::refresh))
        .route("/calendars/:id/book", post(calendars::book))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.allowed_origins))
        .with_state(state)
}
