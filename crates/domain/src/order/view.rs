//! Display projection of an order joined with its venue name.

use chrono::{DateTime, Utc};
use common::{Money, Order, OrderId, OrderState, UserId, Venue, VenueId};
use serde::{Deserialize, Serialize};

/// An order as shown to users and admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub venue_id: VenueId,
    pub venue_name: String,
    pub state: OrderState,
    pub order_time: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub hours: u32,
    pub total: Money,
}

impl OrderView {
    pub fn new(order: Order, venue: &Venue) -> Self {
        Self {
            order_id: order.order_id,
            user_id: order.user_id,
            venue_id: order.venue_id,
            venue_name: venue.venue_name.clone(),
            state: order.state,
            order_time: order.order_time,
            start_time: order.start_time,
            hours: order.hours,
            total: order.total,
        }
    }
}
