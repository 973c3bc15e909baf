use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{arbitration, bookings, views};
use crate::error::AppError;
use crate::models::booking::Booking;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/available", get(list_available))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/accept", post(direct_accept))
        .route("/bookings/:id/select", post(select_bid))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/complete", post(complete_ride))
        .route("/students/:id/bookings", get(student_bookings))
}

#[derive(Deserialize)]
pub struct DriverActionRequest {
    pub driver_id: String,
}

#[derive(Deserialize)]
pub struct SelectBidRequest {
    pub student_id: String,
    pub bid_id: Uuid,
}

#[derive(Deserialize)]
pub struct ActorRequest {
    pub actor_id: String,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<bookings::NewBooking>,
) -> Result<Json<Booking>, AppError> {
    let booking = bookings::create_booking(&state, payload)?;
    Ok(Json(booking))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = bookings::get_booking(&state, id)?;
    Ok(Json(booking))
}

async fn list_available(State(state): State<Arc<AppState>>) -> Json<Vec<Booking>> {
    Json(bookings::list_available(&state, Utc::now()))
}

async fn direct_accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActionRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = arbitration::direct_accept(&state, id, &payload.driver_id)?;
    Ok(Json(booking))
}

async fn select_bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectBidRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = arbitration::select_bid(&state, id, payload.bid_id, &payload.student_id)?;
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = arbitration::cancel_booking(&state, id, &payload.actor_id)?;
    Ok(Json(booking))
}

async fn complete_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = arbitration::complete_ride(&state, id, &payload.actor_id)?;
    Ok(Json(booking))
}

async fn student_bookings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<views::StudentBookingView>> {
    Json(views::student_view(&state, &id))
}
