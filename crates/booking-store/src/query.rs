use chrono::{DateTime, Utc};
use common::{Order, OrderId, OrderState, TimeWindow, UserId, VenueId};

/// Builder for constructing order queries.
///
/// Allows filtering orders by venue, owner, state, booked window and
/// start time range. Results are ordered by order ID.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by venue.
    pub venue_id: Option<VenueId>,

    /// Filter by owning user.
    pub user_id: Option<UserId>,

    /// Filter by states (any of these states).
    pub states: Option<Vec<OrderState>>,

    /// Keep only orders whose window overlaps this one (half-open).
    pub overlapping: Option<TimeWindow>,

    /// Filter by start time at or after this instant.
    pub starting_from: Option<DateTime<Utc>>,

    /// Filter by start time at or before this instant.
    pub starting_until: Option<DateTime<Utc>>,

    /// Leave this order out of the results.
    pub exclude: Option<OrderId>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific venue.
    pub fn for_venue(venue_id: VenueId) -> Self {
        Self {
            venue_id: Some(venue_id),
            ..Default::default()
        }
    }

    /// Creates a query for orders owned by a user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Filters by a single state.
    pub fn state(mut self, state: OrderState) -> Self {
        self.states = Some(vec![state]);
        self
    }

    /// Filters by multiple states (any of these).
    pub fn states(mut self, states: Vec<OrderState>) -> Self {
        self.states = Some(states);
        self
    }

    /// Keeps only orders that hold a slot: every state except `Reject`.
    pub fn occupying(self) -> Self {
        self.states(
            OrderState::ALL
                .into_iter()
                .filter(OrderState::occupies_slot)
                .collect(),
        )
    }

    /// Occupying orders on `venue_id` overlapping `window`, other than `exclude`.
    pub fn conflicting(venue_id: VenueId, window: TimeWindow, exclude: Option<OrderId>) -> Self {
        let query = Self::for_venue(venue_id).occupying().overlapping(window);
        match exclude {
            Some(order_id) => query.excluding(order_id),
            None => query,
        }
    }

    /// Keeps only orders overlapping `window`.
    pub fn overlapping(mut self, window: TimeWindow) -> Self {
        self.overlapping = Some(window);
        self
    }

    /// Keeps orders starting in `[from, until]`.
    pub fn starting_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.starting_from = Some(from);
        self.starting_until = Some(until);
        self
    }

    /// Leaves one order out of the results.
    pub fn excluding(mut self, order_id: OrderId) -> Self {
        self.exclude = Some(order_id);
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the same filter without paging.
    pub fn unpaged(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// Returns true if `order` passes every filter. Paging is not applied.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(venue_id) = self.venue_id
            && order.venue_id != venue_id
        {
            return false;
        }
        if let Some(ref user_id) = self.user_id
            && &order.user_id != user_id
        {
            return false;
        }
        if let Some(ref states) = self.states
            && !states.contains(&order.state)
        {
            return false;
        }
        if let Some(ref window) = self.overlapping
            && !order.window().is_ok_and(|own| own.overlaps(window))
        {
            return false;
        }
        if let Some(from) = self.starting_from
            && order.start_time < from
        {
            return false;
        }
        if let Some(until) = self.starting_until
            && order.start_time > until
        {
            return false;
        }
        if let Some(excluded) = self.exclude
            && order.order_id == excluded
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::Money;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    fn order(id: i64, venue: i64, state: OrderState, start_hour: u32, hours: u32) -> Order {
        Order {
            order_id: OrderId::new(id),
            user_id: UserId::new("alice"),
            venue_id: VenueId::new(venue),
            state,
            order_time: at(0),
            start_time: at(start_hour),
            hours,
            total: Money::from_cents(100).multiply(hours),
        }
    }

    #[test]
    fn query_for_venue() {
        let query = OrderQuery::for_venue(VenueId::new(1));

        assert_eq!(query.venue_id, Some(VenueId::new(1)));
        assert!(query.states.is_none());
        assert!(query.matches(&order(1, 1, OrderState::Reject, 10, 1)));
        assert!(!query.matches(&order(2, 2, OrderState::NoAudit, 10, 1)));
    }

    #[test]
    fn conflicting_skips_the_excluded_order() {
        let window = TimeWindow::new(at(11), at(12)).unwrap();
        let own = order(1, 1, OrderState::NoAudit, 10, 2);
        let other = order(2, 1, OrderState::Wait, 11, 1);

        let query = OrderQuery::conflicting(VenueId::new(1), window, Some(own.order_id));
        assert!(!query.matches(&own));
        assert!(query.matches(&other));
        assert!(OrderQuery::conflicting(VenueId::new(1), window, None).matches(&own));
    }

    #[test]
    fn occupying_overlap_ignores_rejected_orders() {
        let window = TimeWindow::new(at(11), at(12)).unwrap();
        let query = OrderQuery::for_venue(VenueId::new(1))
            .occupying()
            .overlapping(window);

        assert!(query.matches(&order(1, 1, OrderState::Wait, 10, 2)));
        assert!(!query.matches(&order(2, 1, OrderState::Reject, 10, 2)));
        assert!(!query.matches(&order(3, 1, OrderState::Wait, 12, 1)));
    }

    #[test]
    fn excluding_drops_one_order() {
        let query = OrderQuery::for_venue(VenueId::new(1)).excluding(OrderId::new(1));

        assert!(!query.matches(&order(1, 1, OrderState::Wait, 10, 2)));
        assert!(query.matches(&order(2, 1, OrderState::Wait, 10, 2)));
    }

    #[test]
    fn starting_between_is_inclusive() {
        let query = OrderQuery::new().starting_between(at(10), at(12));

        assert!(query.matches(&order(1, 1, OrderState::Wait, 10, 1)));
        assert!(query.matches(&order(2, 1, OrderState::Wait, 12, 1)));
        assert!(!query.matches(&order(3, 1, OrderState::Wait, 13, 1)));
    }

    #[test]
    fn query_builder_chain() {
        let query = OrderQuery::for_user(UserId::new("bob"))
            .state(OrderState::NoAudit)
            .limit(10)
            .offset(20);

        assert_eq!(query.user_id, Some(UserId::new("bob")));
        assert_eq!(query.states, Some(vec![OrderState::NoAudit]));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));

        let unpaged = query.unpaged();
        assert!(unpaged.limit.is_none());
        assert!(unpaged.offset.is_none());
        assert_eq!(unpaged.states, Some(vec![OrderState::NoAudit]));
    }
}
