use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    NewOrder, Order, OrderId, OrderState, Page, PageRequest, TimeWindow, UserId, Venue, VenueId,
};

use crate::{OrderQuery, Result};

/// Result of a conflict-checked write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// The order was written.
    Booked(Order),

    /// An occupying order on the same venue overlaps the window.
    SlotTaken,

    /// The order to overwrite does not exist.
    OrderMissing,
}

impl BookingOutcome {
    /// Returns the written order, if any.
    pub fn booked(self) -> Option<Order> {
        match self {
            BookingOutcome::Booked(order) => Some(order),
            BookingOutcome::SlotTaken | BookingOutcome::OrderMissing => None,
        }
    }
}

/// Core trait for order store implementations.
///
/// The order store is the durable record of orders. All implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Looks an order up by ID. Returns None if it doesn't exist.
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves orders matching a query, ordered by order ID.
    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Counts orders matching a query. Paging fields are ignored.
    async fn count_orders(&self, query: OrderQuery) -> Result<usize>;

    /// Inserts a new order and returns it with its assigned ID.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Inserts a new order unless its window is already taken on its venue.
    ///
    /// The conflict scan and the insert are atomic with respect to every
    /// other conflict-checked write on the same venue, across processes.
    async fn create_if_free(&self, order: NewOrder) -> Result<BookingOutcome>;

    /// Fully overwrites an existing order unless its new window is taken.
    ///
    /// The order's own stored window never conflicts. Never inserts: a
    /// missing order yields [`BookingOutcome::OrderMissing`].
    async fn update_if_free(&self, order: Order) -> Result<BookingOutcome>;

    /// Writes an order under its ID, inserting or fully overwriting.
    async fn save(&self, order: Order) -> Result<Order>;

    /// Sets an order's state unconditionally. Missing orders are ignored.
    async fn update_state(&self, state: OrderState, order_id: OrderId) -> Result<()>;

    /// Sets an order's state only if it is currently `from`.
    ///
    /// The compare and the write happen atomically. Returns false if the
    /// order is missing or was not in `from`.
    async fn transition_state(
        &self,
        order_id: OrderId,
        from: OrderState,
        to: OrderState,
    ) -> Result<bool>;

    /// Deletes an order. Deleting a missing order is not an error.
    async fn delete_by_id(&self, order_id: OrderId) -> Result<()>;
}

/// Extension trait providing the lookups the booking engine needs.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Orders on `venue_id` that hold a slot overlapping `window`.
    async fn find_overlapping(&self, venue_id: VenueId, window: TimeWindow) -> Result<Vec<Order>> {
        self.query_orders(OrderQuery::for_venue(venue_id).occupying().overlapping(window))
            .await
    }

    /// Orders on `venue_id` whose start time lies in `[from, until]`.
    async fn find_by_venue_starting_between(
        &self,
        venue_id: VenueId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>> {
        self.query_orders(OrderQuery::for_venue(venue_id).starting_between(from, until))
            .await
    }

    /// One page of a user's orders.
    async fn find_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Order>> {
        self.find_page(OrderQuery::for_user(user_id), page).await
    }

    /// One page of orders in `state`.
    async fn find_by_state(&self, state: OrderState, page: PageRequest) -> Result<Page<Order>> {
        self.find_page(OrderQuery::new().state(state), page).await
    }

    /// Every order in any of `states`, unpaged.
    async fn find_by_states(&self, states: Vec<OrderState>) -> Result<Vec<Order>> {
        self.query_orders(OrderQuery::new().states(states)).await
    }

    /// Runs `query` for one page and counts the full result set.
    async fn find_page(&self, query: OrderQuery, page: PageRequest) -> Result<Page<Order>> {
        let total = self.count_orders(query.unpaged()).await?;
        let items = self
            .query_orders(query.offset(page.offset()).limit(page.size))
            .await?;
        Ok(Page::new(items, page, total))
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Resolves venues. Owned outside the booking engine.
#[async_trait]
pub trait VenueDirectory: Send + Sync {
    /// Looks a venue up by its unique name.
    async fn find_venue_by_name(&self, venue_name: &str) -> Result<Option<Venue>>;

    /// Looks a venue up by ID.
    async fn find_venue_by_id(&self, venue_id: VenueId) -> Result<Option<Venue>>;
}

/// Resolves users. Owned outside the booking engine.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns true if a user with this ID exists.
    async fn exists_by_id(&self, user_id: &UserId) -> Result<bool>;
}
