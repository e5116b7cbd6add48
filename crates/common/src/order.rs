//! Order and venue records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, OrderId, OrderState, TimeWindow, UserId, VenueId, WindowError};

/// A reservation of one venue for a contiguous block of whole hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub venue_id: VenueId,
    pub state: OrderState,
    /// When the order was created or last rewritten.
    pub order_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub hours: u32,
    /// `hours * price` at submission time. Never recomputed.
    pub total: Money,
}

impl Order {
    /// Returns the slot `[start_time, start_time + hours)`.
    pub fn window(&self) -> Result<TimeWindow, WindowError> {
        TimeWindow::from_hours(self.start_time, i64::from(self.hours))
    }

    /// Returns true if this order blocks `window` on its venue.
    pub fn blocks(&self, window: &TimeWindow) -> bool {
        self.state.occupies_slot() && self.window().is_ok_and(|own| own.overlaps(window))
    }
}

/// An order that has not been stored yet; the store assigns its ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub venue_id: VenueId,
    pub state: OrderState,
    pub order_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub hours: u32,
    pub total: Money,
}

impl NewOrder {
    /// Returns the slot `[start_time, start_time + hours)`.
    pub fn window(&self) -> Result<TimeWindow, WindowError> {
        TimeWindow::from_hours(self.start_time, i64::from(self.hours))
    }

    /// Attaches a store-assigned ID.
    pub fn with_id(self, order_id: OrderId) -> Order {
        Order {
            order_id,
            user_id: self.user_id,
            venue_id: self.venue_id,
            state: self.state,
            order_time: self.order_time,
            start_time: self.start_time,
            hours: self.hours,
            total: self.total,
        }
    }
}

/// A bookable venue. Read-only from the engine's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub venue_id: VenueId,
    /// Unique display name, used to look venues up on submission.
    pub venue_name: String,
    pub description: String,
    /// Price per hour.
    pub price: Money,
    pub picture: String,
    pub address: String,
    /// Opening time as entered by the venue admin, e.g. "9:00".
    pub open_time: String,
    pub close_time: String,
}

impl Venue {
    /// Creates a venue with only the booking-relevant fields set.
    pub fn new(venue_id: VenueId, venue_name: impl Into<String>, price: Money) -> Self {
        Self {
            venue_id,
            venue_name: venue_name.into(),
            description: String::new(),
            price,
            picture: String::new(),
            address: String::new(),
            open_time: String::new(),
            close_time: String::new(),
        }
    }

    /// Sets the descriptive opening hours.
    pub fn with_hours(mut self, open_time: impl Into<String>, close_time: impl Into<String>) -> Self {
        self.open_time = open_time.into();
        self.close_time = close_time.into();
        self
    }

    /// Returns the total owed for booking this venue for `hours`.
    pub fn total_for(&self, hours: u32) -> Money {
        self.price.multiply(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(state: OrderState, start_hour: u32, hours: u32) -> Order {
        Order {
            order_id: OrderId::new(1),
            user_id: UserId::new("alice"),
            venue_id: VenueId::new(1),
            state,
            order_time: Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap(),
            start_time: Utc.with_ymd_and_hms(2030, 6, 1, start_hour, 0, 0).unwrap(),
            hours,
            total: Money::from_cents(100).multiply(hours),
        }
    }

    fn window(start_hour: u32, end_hour: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2030, 6, 1, start_hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2030, 6, 1, end_hour, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn rejected_orders_never_block() {
        assert!(order(OrderState::NoAudit, 10, 2).blocks(&window(11, 12)));
        assert!(order(OrderState::Finish, 10, 2).blocks(&window(11, 12)));
        assert!(!order(OrderState::Reject, 10, 2).blocks(&window(11, 12)));
    }

    #[test]
    fn orders_ending_at_window_start_do_not_block() {
        assert!(!order(OrderState::Wait, 10, 2).blocks(&window(12, 13)));
    }

    #[test]
    fn zero_hour_orders_cover_nothing() {
        let empty = order(OrderState::Wait, 10, 0);
        assert!(empty.window().is_err());
        assert!(!empty.blocks(&window(9, 12)));
    }

    #[test]
    fn venue_total_is_hours_times_price() {
        let venue = Venue::new(VenueId::new(1), "court", Money::from_cents(100))
            .with_hours("9:00", "20:00");
        assert_eq!(venue.total_for(2), Money::from_cents(200));
        assert_eq!(venue.open_time, "9:00");
    }

    #[test]
    fn new_order_takes_assigned_id() {
        let draft = NewOrder {
            user_id: UserId::new("alice"),
            venue_id: VenueId::new(3),
            state: OrderState::NoAudit,
            order_time: Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap(),
            start_time: Utc.with_ymd_and_hms(2030, 6, 1, 10, 0, 0).unwrap(),
            hours: 1,
            total: Money::from_cents(100),
        };
        let stored = draft.clone().with_id(OrderId::new(9));
        assert_eq!(stored.order_id, OrderId::new(9));
        assert_eq!(stored.venue_id, draft.venue_id);
    }
}
