use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::bid::Bid;
use crate::models::booking::Booking;
use crate::observability::metrics::Metrics;

/// The booking map entry is the per-booking lock: every state-changing
/// operation runs inside a `get_mut` guard on the booking, and bid entries
/// are only touched while that guard is held (lock order booking -> bids).
pub struct AppState {
    pub bookings: DashMap<Uuid, Booking>,
    pub bids: DashMap<Uuid, Bid>,
    pub booking_events_tx: broadcast::Sender<Booking>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (booking_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            bookings: DashMap::new(),
            bids: DashMap::new(),
            booking_events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn publish_booking(&self, booking: &Booking) {
        let _ = self.booking_events_tx.send(booking.clone());
    }
}
