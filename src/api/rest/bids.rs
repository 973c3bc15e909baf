use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{bids, views};
use crate::error::AppError;
use crate::models::bid::Bid;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings/:id/bids", post(place_bid).get(list_bids))
        .route("/bids/:id/withdraw", post(withdraw_bid))
        .route("/drivers/:id/view", get(driver_view))
}

#[derive(Deserialize)]
pub struct PlaceBidRequest {
    pub driver_id: String,
    pub proposed_fare: f64,
}

#[derive(Deserialize)]
pub struct WithdrawBidRequest {
    pub driver_id: String,
}

async fn place_bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<Json<Bid>, AppError> {
    let bid = bids::place_bid(&state, id, &payload.driver_id, payload.proposed_fare)?;
    Ok(Json(bid))
}

async fn list_bids(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, AppError> {
    let bids = bids::list_for_booking(&state, id)?;
    Ok(Json(bids))
}

async fn withdraw_bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WithdrawBidRequest>,
) -> Result<Json<Bid>, AppError> {
    let bid = bids::withdraw_bid(&state, id, &payload.driver_id)?;
    Ok(Json(bid))
}

async fn driver_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<views::DriverView> {
    Json(views::driver_view(&state, &id, Utc::now()))
}
