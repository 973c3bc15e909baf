use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Proposed,
    Accepted,
    Rejected,
    Withdrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub bid_id: Uuid,
    pub booking_id: Uuid,
    pub driver_id: String,
    pub proposed_fare: f64,
    pub bid_status: BidStatus,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(booking_id: Uuid, driver_id: String, proposed_fare: f64) -> Self {
        Self {
            bid_id: Uuid::new_v4(),
            booking_id,
            driver_id,
            proposed_fare,
            bid_status: BidStatus::Proposed,
            created_at: Utc::now(),
        }
    }

    pub fn is_proposed(&self) -> bool {
        self.bid_status == BidStatus::Proposed
    }
}
