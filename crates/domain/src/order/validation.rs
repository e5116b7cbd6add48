//! Submission and update validation.
//!
//! A booking that fails any check is dropped without an error. The
//! [`Rejection`] only feeds logs and metrics.

use booking_store::{StoreError, UserDirectory, VenueDirectory};
use chrono::{DateTime, Utc};
use common::{Money, TimeWindow, UserId, Venue};

/// Raw booking parameters as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub venue_name: String,
    pub start_time: DateTime<Utc>,
    pub hours: i64,
    pub user_id: UserId,
}

impl BookingRequest {
    pub fn new(
        venue_name: impl Into<String>,
        start_time: DateTime<Utc>,
        hours: i64,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            venue_name: venue_name.into(),
            start_time,
            hours,
            user_id: user_id.into(),
        }
    }
}

/// A booking that passed every check except the conflict scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBooking {
    pub venue: Venue,
    pub user_id: UserId,
    pub window: TimeWindow,
    pub hours: u32,
    pub total: Money,
}

/// Why a submission or update was silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    VenueNotFound,
    UserNotFound,
    OrderNotFound,
    StartNotInFuture,
    InvalidHours,
    SlotTaken,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::VenueNotFound => "venue_not_found",
            Rejection::UserNotFound => "user_not_found",
            Rejection::OrderNotFound => "order_not_found",
            Rejection::StartNotInFuture => "start_not_in_future",
            Rejection::InvalidHours => "invalid_hours",
            Rejection::SlotTaken => "slot_taken",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Checks the parts of a booking that do not depend on other orders.
///
/// The venue is resolved by name, the user by existence only, and the
/// window must start strictly after `now` and last a positive number of
/// whole hours that fits the stored `i32` duration.
pub async fn validate_booking<V, U>(
    venues: &V,
    users: &U,
    now: DateTime<Utc>,
    request: &BookingRequest,
) -> Result<Result<ValidBooking, Rejection>, StoreError>
where
    V: VenueDirectory + ?Sized,
    U: UserDirectory + ?Sized,
{
    let Some(venue) = venues.find_venue_by_name(&request.venue_name).await? else {
        return Ok(Err(Rejection::VenueNotFound));
    };

    if !users.exists_by_id(&request.user_id).await? {
        return Ok(Err(Rejection::UserNotFound));
    }

    if request.start_time <= now {
        return Ok(Err(Rejection::StartNotInFuture));
    }

    let Some(hours) = i32::try_from(request.hours)
        .ok()
        .and_then(|hours| u32::try_from(hours).ok())
    else {
        return Ok(Err(Rejection::InvalidHours));
    };
    let Ok(window) = TimeWindow::from_hours(request.start_time, request.hours) else {
        return Ok(Err(Rejection::InvalidHours));
    };

    Ok(Ok(ValidBooking {
        total: venue.total_for(hours),
        venue,
        user_id: request.user_id.clone(),
        window,
        hours,
    }))
}
