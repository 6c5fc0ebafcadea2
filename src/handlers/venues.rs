use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::{Address, NewVenue, VenueId};
use crate::state::SharedState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};
use crate::venues::{self, VenueFilter, VenueSummary};

#[derive(Deserialize)]
pub struct RegisterVenueRequest {
    pub account: Address,
    #[serde(flatten)]
    pub venue: NewVenue,
}

#[derive(Serialize)]
struct RegisteredVenue {
    venue_id: VenueId,
}

pub async fn list_venues(
    State(state): State<SharedState>,
    Query(filter): Query<VenueFilter>,
) -> Result<Response, AppError> {
    let venues: Vec<VenueSummary> = venues::list_venues(state.ledger.as_ref(), &filter)
        .await?
        .into_iter()
        .map(VenueSummary::from)
        .collect();

    Ok(success(venues, "Venues retrieved"))
}

pub async fn get_venue(
    State(state): State<SharedState>,
    Path(venue_id): Path<VenueId>,
) -> Result<Response, AppError> {
    let venue = venues::venue_details(state.ledger.as_ref(), venue_id).await?;
    Ok(success(VenueSummary::from(venue), "Venue retrieved"))
}

pub async fn register_venue(
    State(state): State<SharedState>,
    Json(request): Json<RegisterVenueRequest>,
) -> Result<Response, AppError> {
    request.venue.validate()?;

    let venue_id =
        venues::register_venue(state.ledger.as_ref(), &request.account, request.venue).await?;
    Ok(created(RegisteredVenue { venue_id }, "Venue registered"))
}
