use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingKind, Frequency};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedType {
    OneTime,
    Regular,
}

#[derive(Debug, Deserialize)]
pub struct NewBooking {
    pub student_id: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub required_time: DateTime<Utc>,
    pub booking_type: RequestedType,
    pub frequency: Option<Frequency>,
    pub end_date: Option<DateTime<Utc>>,
    pub fixed_fare: Option<f64>,
}

pub fn create_booking(state: &AppState, req: NewBooking) -> Result<Booking, AppError> {
    let kind = validate(&req, Utc::now())?;

    let booking = Booking::new(
        req.student_id,
        req.pickup_location.trim().to_string(),
        req.dropoff_location.trim().to_string(),
        req.required_time,
        kind,
        req.fixed_fare,
    );

    state.bookings.insert(booking.booking_id, booking.clone());
    state.metrics.bookings_created_total.inc();
    state.metrics.pending_bookings.inc();
    state.publish_booking(&booking);

    info!(booking_id = %booking.booking_id, student_id = %booking.student_id, "booking created");

    Ok(booking)
}

fn validate(req: &NewBooking, now: DateTime<Utc>) -> Result<BookingKind, AppError> {
    if req.student_id.trim().is_empty() {
        return Err(AppError::Validation("student_id cannot be empty".to_string()));
    }

    if req.pickup_location.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup_location cannot be empty".to_string(),
        ));
    }

    if req.dropoff_location.trim().is_empty() {
        return Err(AppError::Validation(
            "dropoff_location cannot be empty".to_string(),
        ));
    }

    if req.required_time <= now {
        return Err(AppError::Validation(
            "required_time must be in the future".to_string(),
        ));
    }

    if let Some(fare) = req.fixed_fare {
        if fare <= 0.0 {
            return Err(AppError::Validation("fixed_fare must be > 0".to_string()));
        }
    }

    match req.booking_type {
        RequestedType::OneTime => Ok(BookingKind::OneTime),
        RequestedType::Regular => {
            let frequency = req.frequency.ok_or_else(|| {
                AppError::Validation("frequency is required for regular bookings".to_string())
            })?;
            let end_date = req.end_date.ok_or_else(|| {
                AppError::Validation("end_date is required for regular bookings".to_string())
            })?;

            if end_date < req.required_time {
                return Err(AppError::Validation(
                    "end_date must not be before required_time".to_string(),
                ));
            }

            Ok(BookingKind::Regular {
                frequency,
                end_date,
            })
        }
    }
}

pub fn get_booking(state: &AppState, booking_id: Uuid) -> Result<Booking, AppError> {
    state
        .bookings
        .get(&booking_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))
}

pub fn list_by_student(state: &AppState, student_id: &str) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .filter(|entry| entry.student_id == student_id)
        .map(|entry| entry.value().clone())
        .collect();

    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

pub fn list_available(state: &AppState, now: DateTime<Utc>) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .filter(|entry| entry.is_open_at(now))
        .map(|entry| entry.value().clone())
        .collect();

    bookings.sort_by(|a, b| a.required_time.cmp(&b.required_time));
    bookings
}

pub fn list_by_driver(state: &AppState, driver_id: &str) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .filter(|entry| entry.assigned_driver_id.as_deref() == Some(driver_id))
        .map(|entry| entry.value().clone())
        .collect();

    bookings.sort_by(|a, b| a.required_time.cmp(&b.required_time));
    bookings
}
