pub mod bid;
pub mod booking;
