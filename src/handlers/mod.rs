use axum::response::Response;
use serde::Serialize;

use crate::models::Address;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod accounts;
pub mod calendars;
pub mod venues;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "sportspot-api",
    };

    success(payload, "Health check successful")
}

pub(crate) fn parse_address(raw: &str) -> Result<Address, AppError> {
    raw.parse::<Address>()
        .map_err(|e| AppError::ValidationError(e.to_string()))
}
