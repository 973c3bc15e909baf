use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::bid::{Bid, BidStatus};
use crate::state::AppState;

pub fn place_bid(
    state: &AppState,
    booking_id: Uuid,
    driver_id: &str,
    proposed_fare: f64,
) -> Result<Bid, AppError> {
    if proposed_fare <= 0.0 {
        return Err(AppError::Validation("proposed_fare must be > 0".to_string()));
    }

    if driver_id.trim().is_empty() {
        return Err(AppError::Validation("driver_id cannot be empty".to_string()));
    }

    // Exclusive guard on the booking so a concurrent arbitration call cannot
    // resolve it between the status check and the bid insert.
    let booking = state
        .bookings
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

    if !booking.is_open_at(Utc::now()) {
        return Err(AppError::InvalidState(
            "this ride is no longer available".to_string(),
        ));
    }

    let has_open_bid = state
        .bids
        .iter()
        .any(|bid| bid.booking_id == booking_id && bid.driver_id == driver_id && bid.is_proposed());

    if has_open_bid {
        return Err(AppError::Conflict(
            "driver already has an open bid on this booking, withdraw it first".to_string(),
        ));
    }

    let bid = Bid::new(booking_id, driver_id.to_string(), proposed_fare);
    state.bids.insert(bid.bid_id, bid.clone());
    state.metrics.bids_placed_total.inc();

    info!(
        bid_id = %bid.bid_id,
        booking_id = %booking_id,
        driver_id = %driver_id,
        proposed_fare,
        "bid placed"
    );

    Ok(bid)
}

pub fn withdraw_bid(state: &AppState, bid_id: Uuid, driver_id: &str) -> Result<Bid, AppError> {
    let booking_id = state
        .bids
        .get(&bid_id)
        .map(|bid| bid.booking_id)
        .ok_or_else(|| AppError::NotFound(format!("bid {} not found", bid_id)))?;

    // Take the booking guard before the bid guard (same order as
    // arbitration) so a withdrawal cannot slip between a booking leaving
    // pending and its bid cascade.
    let booking = state
        .bookings
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

    let mut bid = state
        .bids
        .get_mut(&bid_id)
        .ok_or_else(|| AppError::NotFound(format!("bid {} not found", bid_id)))?;

    if bid.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "only the submitting driver can withdraw a bid".to_string(),
        ));
    }

    if !booking.is_pending() {
        return Err(AppError::InvalidState(
            "this booking has already been decided".to_string(),
        ));
    }

    if !bid.is_proposed() {
        return Err(AppError::InvalidState(
            "bid has already been resolved".to_string(),
        ));
    }

    bid.bid_status = BidStatus::Withdrawn;

    info!(bid_id = %bid_id, driver_id = %driver_id, "bid withdrawn");

    Ok(bid.clone())
}

pub fn list_for_booking(state: &AppState, booking_id: Uuid) -> Result<Vec<Bid>, AppError> {
    if !state.bookings.contains_key(&booking_id) {
        return Err(AppError::NotFound(format!("booking {} not found", booking_id)));
    }

    Ok(ordered_bids_for(state, booking_id))
}

/// Cheapest fare first, earliest bid breaking ties. Presentation order only.
pub fn ordered_bids_for(state: &AppState, booking_id: Uuid) -> Vec<Bid> {
    let mut bids: Vec<Bid> = state
        .bids
        .iter()
        .filter(|bid| bid.booking_id == booking_id)
        .map(|entry| entry.value().clone())
        .collect();

    bids.sort_by(|a, b| {
        a.proposed_fare
            .total_cmp(&b.proposed_fare)
            .then(a.created_at.cmp(&b.created_at))
    });
    bids
}

/// Moves every still-proposed bid on the booking to `to`, skipping the
/// winning bid if one is given. Must be called while the caller holds the
/// booking's record guard so the cascade lands atomically with the status
/// edge.
pub(crate) fn resolve_open_bids(
    state: &AppState,
    booking_id: Uuid,
    winning_bid: Option<Uuid>,
    to: BidStatus,
) {
    for mut bid in state.bids.iter_mut() {
        if bid.booking_id != booking_id || !bid.is_proposed() {
            continue;
        }
        if winning_bid == Some(bid.bid_id) {
            continue;
        }
        bid.bid_status = to;
    }
}
