use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Weekdays,
    Weekends,
}

/// Serialized inline into the booking, so the wire carries `booking_type`
/// plus `frequency`/`end_date` only for recurring rides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "booking_type", rename_all = "snake_case")]
pub enum BookingKind {
    OneTime,
    Regular {
        frequency: Frequency,
        end_date: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub student_id: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub required_time: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: BookingKind,
    pub fixed_fare: Option<f64>,
    pub status: BookingStatus,
    pub assigned_driver_id: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        student_id: String,
        pickup_location: String,
        dropoff_location: String,
        required_time: DateTime<Utc>,
        kind: BookingKind,
        fixed_fare: Option<f64>,
    ) -> Self {
        let now = Utc::now();

        Self {
            booking_id: Uuid::new_v4(),
            student_id,
            pickup_location,
            dropoff_location,
            required_time,
            kind,
            fixed_fare,
            status: BookingStatus::Pending,
            assigned_driver_id: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    /// Whether drivers should still see this booking in the open pool.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.required_time > now
    }

    pub fn accept(&mut self, driver_id: &str) -> Result<(), AppError> {
        if self.status != BookingStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "booking {} is {}, only pending bookings can be accepted",
                self.booking_id, self.status
            )));
        }

        self.status = BookingStatus::Accepted;
        self.assigned_driver_id = Some(driver_id.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self, reason: &str) -> Result<(), AppError> {
        match self.status {
            BookingStatus::Pending | BookingStatus::Accepted => {
                self.status = BookingStatus::Cancelled;
                self.assigned_driver_id = None;
                self.cancellation_reason = Some(reason.to_string());
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(AppError::InvalidTransition(format!(
                "booking {} is already {}",
                self.booking_id, self.status
            ))),
        }
    }

    pub fn complete(&mut self) -> Result<(), AppError> {
        if self.status != BookingStatus::Accepted {
            return Err(AppError::InvalidTransition(format!(
                "booking {} is {}, only accepted rides can be completed",
                self.booking_id, self.status
            )));
        }

        self.status = BookingStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Invariant check used by tests: a driver is bound exactly while the
    /// booking is accepted or completed.
    pub fn driver_binding_consistent(&self) -> bool {
        match self.status {
            BookingStatus::Accepted | BookingStatus::Completed => {
                self.assigned_driver_id.is_some()
            }
            BookingStatus::Pending | BookingStatus::Cancelled => {
                self.assigned_driver_id.is_none()
            }
        }
    }
}
