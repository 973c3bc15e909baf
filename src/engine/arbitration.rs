use tracing::info;
use uuid::Uuid;

use crate::engine::bids::resolve_open_bids;
use crate::error::AppError;
use crate::models::bid::BidStatus;
use crate::models::booking::Booking;
use crate::state::AppState;

/// A driver claims a fixed-fare booking at its posted price. First caller
/// to commit the pending -> accepted edge wins; everyone else observes
/// `Conflict`.
pub fn direct_accept(
    state: &AppState,
    booking_id: Uuid,
    driver_id: &str,
) -> Result<Booking, AppError> {
    let mut booking = state
        .bookings
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

    if booking.fixed_fare.is_none() {
        return Err(AppError::InvalidState(
            "this booking is open to bidding and has no fixed fare".to_string(),
        ));
    }

    if !booking.is_pending() {
        state
            .metrics
            .arbitration_total
            .with_label_values(&["direct_accept", "lost"])
            .inc();
        return Err(AppError::Conflict(
            "this ride is no longer available".to_string(),
        ));
    }

    booking.accept(driver_id)?;
    resolve_open_bids(state, booking_id, None, BidStatus::Rejected);
    state.metrics.pending_bookings.dec();
    state
        .metrics
        .arbitration_total
        .with_label_values(&["direct_accept", "won"])
        .inc();

    let snapshot = booking.clone();
    drop(booking);
    state.publish_booking(&snapshot);

    info!(booking_id = %booking_id, driver_id = %driver_id, "booking filled by direct acceptance");

    Ok(snapshot)
}

/// The student picks one bid; the chosen bid becomes accepted, the booking
/// binds its driver, and every other open bid is rejected, all under the
/// booking's record guard.
pub fn select_bid(
    state: &AppState,
    booking_id: Uuid,
    bid_id: Uuid,
    student_id: &str,
) -> Result<Booking, AppError> {
    let mut booking = state
        .bookings
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

    if booking.student_id != student_id {
        return Err(AppError::Forbidden(
            "only the booking's student can select a bid".to_string(),
        ));
    }

    if !booking.is_pending() {
        state
            .metrics
            .arbitration_total
            .with_label_values(&["select_bid", "lost"])
            .inc();
        return Err(AppError::InvalidState(
            "this booking has already been decided".to_string(),
        ));
    }

    let winning_driver = {
        let mut bid = state
            .bids
            .get_mut(&bid_id)
            .ok_or_else(|| AppError::NotFound(format!("bid {} not found", bid_id)))?;

        if bid.booking_id != booking_id {
            return Err(AppError::NotFound(format!(
                "bid {} does not belong to booking {}",
                bid_id, booking_id
            )));
        }

        if !bid.is_proposed() {
            return Err(AppError::InvalidState(
                "this bid has already been resolved".to_string(),
            ));
        }

        bid.bid_status = BidStatus::Accepted;
        bid.driver_id.clone()
    };

    booking.accept(&winning_driver)?;
    resolve_open_bids(state, booking_id, Some(bid_id), BidStatus::Rejected);
    state.metrics.pending_bookings.dec();
    state
        .metrics
        .arbitration_total
        .with_label_values(&["select_bid", "won"])
        .inc();

    let snapshot = booking.clone();
    drop(booking);
    state.publish_booking(&snapshot);

    info!(
        booking_id = %booking_id,
        bid_id = %bid_id,
        driver_id = %winning_driver,
        "bid selected"
    );

    Ok(snapshot)
}

pub fn cancel_booking(
    state: &AppState,
    booking_id: Uuid,
    actor_id: &str,
) -> Result<Booking, AppError> {
    let mut booking = state
        .bookings
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

    if booking.student_id != actor_id {
        return Err(AppError::Forbidden(
            "only the booking's student can cancel it".to_string(),
        ));
    }

    let was_pending = booking.is_pending();
    booking.cancel("cancelled by student")?;

    if was_pending {
        resolve_open_bids(state, booking_id, None, BidStatus::Withdrawn);
        state.metrics.pending_bookings.dec();
    }
    state
        .metrics
        .arbitration_total
        .with_label_values(&["cancel", "won"])
        .inc();

    let snapshot = booking.clone();
    drop(booking);
    state.publish_booking(&snapshot);

    info!(booking_id = %booking_id, actor_id = %actor_id, "booking cancelled");

    Ok(snapshot)
}

pub fn complete_ride(
    state: &AppState,
    booking_id: Uuid,
    actor_id: &str,
) -> Result<Booking, AppError> {
    let mut booking = state
        .bookings
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

    let is_student = booking.student_id == actor_id;
    let is_assigned_driver = booking.assigned_driver_id.as_deref() == Some(actor_id);

    if !is_student && !is_assigned_driver {
        return Err(AppError::Forbidden(
            "only the student or the assigned driver can complete this ride".to_string(),
        ));
    }

    booking.complete()?;
    state
        .metrics
        .arbitration_total
        .with_label_values(&["complete", "won"])
        .inc();

    let snapshot = booking.clone();
    drop(booking);
    state.publish_booking(&snapshot);

    info!(booking_id = %booking_id, actor_id = %actor_id, "ride completed");

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{cancel_booking, complete_ride, direct_accept, select_bid};
    use crate::engine::bids::{list_for_booking, place_bid};
    use crate::error::AppError;
    use crate::models::bid::BidStatus;
    use crate::models::booking::{Booking, BookingKind, BookingStatus};
    use crate::state::AppState;

    fn seed_booking(state: &AppState, fixed_fare: Option<f64>) -> Booking {
        let booking = Booking::new(
            "student_123".to_string(),
            "Campus".to_string(),
            "Railway Station".to_string(),
            Utc::now() + Duration::hours(2),
            BookingKind::OneTime,
            fixed_fare,
        );
        state.bookings.insert(booking.booking_id, booking.clone());
        booking
    }

    #[test]
    fn direct_accept_assigns_the_driver_and_rejects_open_bids() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, Some(200.0));
        place_bid(&state, booking.booking_id, "driver_b", 180.0).unwrap();

        let accepted = direct_accept(&state, booking.booking_id, "driver_a").unwrap();

        assert_eq!(accepted.status, BookingStatus::Accepted);
        assert_eq!(accepted.assigned_driver_id.as_deref(), Some("driver_a"));
        assert!(accepted.driver_binding_consistent());

        let bids = list_for_booking(&state, booking.booking_id).unwrap();
        assert_eq!(bids[0].bid_status, BidStatus::Rejected);
    }

    #[test]
    fn direct_accept_requires_a_fixed_fare() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, None);

        let err = direct_accept(&state, booking.booking_id, "driver_a").unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn second_direct_accept_observes_conflict() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, Some(200.0));

        direct_accept(&state, booking.booking_id, "driver_a").unwrap();
        let err = direct_accept(&state, booking.booking_id, "driver_b").unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        let stored = state.bookings.get(&booking.booking_id).unwrap();
        assert_eq!(stored.assigned_driver_id.as_deref(), Some("driver_a"));
    }

    #[test]
    fn select_bid_assigns_the_bidder_and_rejects_the_rest() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, None);

        let losing = place_bid(&state, booking.booking_id, "driver_a", 180.0).unwrap();
        let winning = place_bid(&state, booking.booking_id, "driver_b", 150.0).unwrap();

        let accepted =
            select_bid(&state, booking.booking_id, winning.bid_id, "student_123").unwrap();

        assert_eq!(accepted.status, BookingStatus::Accepted);
        assert_eq!(accepted.assigned_driver_id.as_deref(), Some("driver_b"));

        let bids = list_for_booking(&state, booking.booking_id).unwrap();
        let winner = bids.iter().find(|b| b.bid_id == winning.bid_id).unwrap();
        let loser = bids.iter().find(|b| b.bid_id == losing.bid_id).unwrap();
        assert_eq!(winner.bid_status, BidStatus::Accepted);
        assert_eq!(loser.bid_status, BidStatus::Rejected);

        let accepted_count = bids
            .iter()
            .filter(|b| b.bid_status == BidStatus::Accepted)
            .count();
        assert_eq!(accepted_count, 1);
    }

    #[test]
    fn select_bid_is_owner_only() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, None);
        let bid = place_bid(&state, booking.booking_id, "driver_a", 180.0).unwrap();

        let err = select_bid(&state, booking.booking_id, bid.bid_id, "student_456").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn select_bid_on_decided_booking_is_invalid_state() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, Some(200.0));
        let bid = place_bid(&state, booking.booking_id, "driver_a", 180.0).unwrap();

        direct_accept(&state, booking.booking_id, "driver_b").unwrap();

        let err = select_bid(&state, booking.booking_id, bid.bid_id, "student_123").unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn select_bid_from_another_booking_is_not_found() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, None);
        let other = seed_booking(&state, None);
        let stray = place_bid(&state, other.booking_id, "driver_a", 120.0).unwrap();

        let err = select_bid(&state, booking.booking_id, stray.bid_id, "student_123").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn cancel_withdraws_open_bids() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, None);
        place_bid(&state, booking.booking_id, "driver_a", 180.0).unwrap();

        let cancelled = cancel_booking(&state, booking.booking_id, "student_123").unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let bids = list_for_booking(&state, booking.booking_id).unwrap();
        assert_eq!(bids[0].bid_status, BidStatus::Withdrawn);
    }

    #[test]
    fn double_cancel_is_invalid_state_both_times() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, None);

        cancel_booking(&state, booking.booking_id, "student_123").unwrap();

        for _ in 0..2 {
            let err = cancel_booking(&state, booking.booking_id, "student_123").unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition(_)));
        }
    }

    #[test]
    fn complete_is_limited_to_the_participants() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, Some(200.0));
        direct_accept(&state, booking.booking_id, "driver_a").unwrap();

        let err = complete_ride(&state, booking.booking_id, "driver_b").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let done = complete_ride(&state, booking.booking_id, "driver_a").unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert!(done.driver_binding_consistent());
    }

    #[test]
    fn every_arbitration_operation_records_its_outcome() {
        let state = AppState::new(16);
        let completed = seed_booking(&state, Some(200.0));
        let cancelled = seed_booking(&state, None);

        direct_accept(&state, completed.booking_id, "driver_a").unwrap();
        complete_ride(&state, completed.booking_id, "driver_a").unwrap();
        cancel_booking(&state, cancelled.booking_id, "student_123").unwrap();

        let won = |operation: &str| {
            state
                .metrics
                .arbitration_total
                .with_label_values(&[operation, "won"])
                .get()
        };
        assert_eq!(won("direct_accept"), 1);
        assert_eq!(won("complete"), 1);
        assert_eq!(won("cancel"), 1);
    }

    #[test]
    fn late_bid_after_acceptance_is_invalid_state() {
        let state = AppState::new(16);
        let booking = seed_booking(&state, Some(200.0));
        direct_accept(&state, booking.booking_id, "driver_a").unwrap();

        let err = place_bid(&state, booking.booking_id, "driver_c", 150.0).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
