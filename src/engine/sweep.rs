use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::engine::bids::resolve_open_bids;
use crate::models::bid::BidStatus;
use crate::state::AppState;

/// Background sweep that expires stale pending bookings. Runs forever;
/// spawned once at startup.
pub async fn run_lifecycle_sweep(state: Arc<AppState>, interval_secs: u64, grace_secs: i64) {
    info!(interval_secs, grace_secs, "lifecycle sweep started");

    let grace = Duration::seconds(grace_secs);
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;

        let expired = sweep_expired(&state, Utc::now(), grace);
        if expired > 0 {
            info!(expired, "expired stale pending bookings");
        }
    }
}

/// Cancels every pending booking whose required time passed more than
/// `grace` ago and withdraws its open bids. Runs under the same per-booking
/// record guard as arbitration, so an accept that committed first wins.
pub fn sweep_expired(state: &AppState, now: DateTime<Utc>, grace: Duration) -> usize {
    let mut expired = 0;

    for mut booking in state.bookings.iter_mut() {
        if !booking.is_pending() {
            continue;
        }

        if now - booking.required_time <= grace {
            continue;
        }

        if booking.cancel("expired, no driver assigned").is_ok() {
            let booking_id = booking.booking_id;
            resolve_open_bids(state, booking_id, None, BidStatus::Withdrawn);
            state.metrics.bookings_expired_total.inc();
            state.metrics.pending_bookings.dec();
            state.publish_booking(&booking);
            expired += 1;

            info!(booking_id = %booking_id, "booking expired with no driver assigned");
        }
    }

    expired
}
