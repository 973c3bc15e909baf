pub mod arbitration;
pub mod bids;
pub mod bookings;
pub mod sweep;
pub mod views;
