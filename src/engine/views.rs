use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::bids::ordered_bids_for;
use crate::engine::bookings::{list_available, list_by_driver, list_by_student};
use crate::models::bid::{Bid, BidStatus};
use crate::models::booking::{Booking, BookingStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StudentBookingView {
    pub booking: Booking,
    pub bids: Vec<Bid>,
}

#[derive(Debug, Serialize)]
pub struct DriverView {
    pub open_requests: Vec<Booking>,
    pub my_bids: Vec<Bid>,
    pub assigned_rides: Vec<Booking>,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_bookings: usize,
    pub pending: usize,
    pub accepted: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub open_bids: usize,
}

/// Own bookings newest-first; pending ones carry their bids in decision
/// order (cheapest first).
pub fn student_view(state: &AppState, student_id: &str) -> Vec<StudentBookingView> {
    list_by_student(state, student_id)
        .into_iter()
        .map(|booking| {
            let bids = if booking.is_pending() {
                ordered_bids_for(state, booking.booking_id)
            } else {
                Vec::new()
            };
            StudentBookingView { booking, bids }
        })
        .collect()
}

pub fn driver_view(state: &AppState, driver_id: &str, now: DateTime<Utc>) -> DriverView {
    let mut my_bids: Vec<Bid> = state
        .bids
        .iter()
        .filter(|bid| bid.driver_id == driver_id)
        .map(|entry| entry.value().clone())
        .collect();
    my_bids.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    DriverView {
        open_requests: list_available(state, now),
        my_bids,
        assigned_rides: list_by_driver(state, driver_id),
    }
}

/// Counted from the stores on every call; never cached.
pub fn admin_stats(state: &AppState) -> AdminStats {
    let mut stats = AdminStats {
        total_bookings: 0,
        pending: 0,
        accepted: 0,
        completed: 0,
        cancelled: 0,
        open_bids: 0,
    };

    for booking in state.bookings.iter() {
        stats.total_bookings += 1;
        match booking.status {
            BookingStatus::Pending => stats.pending += 1,
            BookingStatus::Accepted => stats.accepted += 1,
            BookingStatus::Completed => stats.completed += 1,
            BookingStatus::Cancelled => stats.cancelled += 1,
        }
    }

    stats.open_bids = state
        .bids
        .iter()
        .filter(|bid| bid.bid_status == BidStatus::Proposed)
        .count();

    stats
}
