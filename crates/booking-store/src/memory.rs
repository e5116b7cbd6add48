use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use common::{NewOrder, Order, OrderId, OrderState, TimeWindow, UserId, Venue, VenueId};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, Result,
    store::{BookingOutcome, OrderStore, UserDirectory, VenueDirectory},
};

/// Returns true if an occupying order other than `exclude` overlaps `window`.
fn slot_taken(
    orders: &BTreeMap<OrderId, Order>,
    venue_id: VenueId,
    window: TimeWindow,
    exclude: Option<OrderId>,
) -> bool {
    let query = OrderQuery::conflicting(venue_id, window, exclude);
    orders.values().any(|order| query.matches(order))
}

/// In-memory order store implementation for testing and embedding.
///
/// Provides the same interface as the PostgreSQL implementation. IDs are
/// assigned from a counter starting at 1.
#[derive(Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<BTreeMap<OrderId, Order>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self {
            orders: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let store = self.orders.read().await;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(store
            .values()
            .filter(|order| query.matches(order))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_orders(&self, query: OrderQuery) -> Result<usize> {
        let store = self.orders.read().await;
        Ok(store.values().filter(|order| query.matches(order)).count())
    }

    async fn create(&self, order: NewOrder) -> Result<Order> {
        let mut store = self.orders.write().await;
        let order_id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let order = order.with_id(order_id);
        store.insert(order_id, order.clone());
        Ok(order)
    }

    async fn create_if_free(&self, order: NewOrder) -> Result<BookingOutcome> {
        let window = order.window()?;

        // Scan and insert under one write guard
        let mut store = self.orders.write().await;
        if slot_taken(&store, order.venue_id, window, None) {
            return Ok(BookingOutcome::SlotTaken);
        }

        let order_id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let order = order.with_id(order_id);
        store.insert(order_id, order.clone());
        Ok(BookingOutcome::Booked(order))
    }

    async fn update_if_free(&self, order: Order) -> Result<BookingOutcome> {
        let window = order.window()?;

        let mut store = self.orders.write().await;
        if !store.contains_key(&order.order_id) {
            return Ok(BookingOutcome::OrderMissing);
        }
        if slot_taken(&store, order.venue_id, window, Some(order.order_id)) {
            return Ok(BookingOutcome::SlotTaken);
        }

        store.insert(order.order_id, order.clone());
        Ok(BookingOutcome::Booked(order))
    }

    async fn save(&self, order: Order) -> Result<Order> {
        let mut store = self.orders.write().await;

        // Keep the counter ahead of explicitly chosen IDs
        self.next_id
            .fetch_max(order.order_id.as_i64() + 1, Ordering::SeqCst);
        store.insert(order.order_id, order.clone());
        Ok(order)
    }

    async fn update_state(&self, state: OrderState, order_id: OrderId) -> Result<()> {
        if let Some(order) = self.orders.write().await.get_mut(&order_id) {
            order.state = state;
        }
        Ok(())
    }

    async fn transition_state(
        &self,
        order_id: OrderId,
        from: OrderState,
        to: OrderState,
    ) -> Result<bool> {
        let mut store = self.orders.write().await;
        match store.get_mut(&order_id) {
            Some(order) if order.state == from => {
                order.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_id(&self, order_id: OrderId) -> Result<()> {
        self.orders.write().await.remove(&order_id);
        Ok(())
    }
}

/// In-memory venue directory.
#[derive(Clone, Default)]
pub struct InMemoryVenueDirectory {
    venues: Arc<RwLock<HashMap<VenueId, Venue>>>,
}

impl InMemoryVenueDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a venue.
    pub async fn insert(&self, venue: Venue) {
        self.venues.write().await.insert(venue.venue_id, venue);
    }

    pub async fn remove(&self, venue_id: VenueId) {
        self.venues.write().await.remove(&venue_id);
    }
}

#[async_trait]
impl VenueDirectory for InMemoryVenueDirectory {
    async fn find_venue_by_name(&self, venue_name: &str) -> Result<Option<Venue>> {
        let venues = self.venues.read().await;
        Ok(venues
            .values()
            .find(|venue| venue.venue_name == venue_name)
            .cloned())
    }

    async fn find_venue_by_id(&self, venue_id: VenueId) -> Result<Option<Venue>> {
        Ok(self.venues.read().await.get(&venue_id).cloned())
    }
}

/// In-memory user directory.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashSet<UserId>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    pub async fn insert(&self, user_id: impl Into<UserId>) {
        self.users.write().await.insert(user_id.into());
    }

    pub async fn remove(&self, user_id: &UserId) {
        self.users.write().await.remove(user_id);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists_by_id(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.users.read().await.contains(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderStoreExt, StoreError};
    use chrono::{DateTime, TimeZone, Utc};
    use common::{Money, PageRequest, TimeWindow};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    fn new_order(user: &str, venue: i64, state: OrderState, start_hour: u32, hours: u32) -> NewOrder {
        NewOrder {
            user_id: UserId::new(user),
            venue_id: VenueId::new(venue),
            state,
            order_time: at(0),
            start_time: at(start_hour),
            hours,
            total: Money::from_cents(100).multiply(hours),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = InMemoryOrderStore::new();

        let first = store
            .create(new_order("alice", 1, OrderState::NoAudit, 10, 1))
            .await
            .unwrap();
        let second = store
            .create(new_order("alice", 1, OrderState::NoAudit, 12, 1))
            .await
            .unwrap();

        assert_eq!(first.order_id, OrderId::new(1));
        assert_eq!(second.order_id, OrderId::new(2));
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn save_overwrites_and_advances_counter() {
        let store = InMemoryOrderStore::new();
        let order = new_order("alice", 1, OrderState::NoAudit, 10, 1).with_id(OrderId::new(10));
        store.save(order.clone()).await.unwrap();

        let mut changed = order.clone();
        changed.hours = 3;
        store.save(changed).await.unwrap();

        let found = store.find_by_id(OrderId::new(10)).await.unwrap().unwrap();
        assert_eq!(found.hours, 3);

        let next = store
            .create(new_order("bob", 1, OrderState::NoAudit, 15, 1))
            .await
            .unwrap();
        assert_eq!(next.order_id, OrderId::new(11));
    }

    #[tokio::test]
    async fn transition_state_compares_before_setting() {
        let store = InMemoryOrderStore::new();
        let order = store
            .create(new_order("alice", 1, OrderState::NoAudit, 10, 1))
            .await
            .unwrap();

        let applied = store
            .transition_state(order.order_id, OrderState::Wait, OrderState::Finish)
            .await
            .unwrap();
        assert!(!applied);

        let applied = store
            .transition_state(order.order_id, OrderState::NoAudit, OrderState::Wait)
            .await
            .unwrap();
        assert!(applied);

        let missing = store
            .transition_state(OrderId::new(99), OrderState::NoAudit, OrderState::Wait)
            .await
            .unwrap();
        assert!(!missing);
    }

    #[tokio::test]
    async fn create_if_free_refuses_overlapping_windows() {
        let store = InMemoryOrderStore::new();

        let first = store
            .create_if_free(new_order("alice", 1, OrderState::NoAudit, 10, 2))
            .await
            .unwrap();
        assert!(matches!(first, BookingOutcome::Booked(_)));

        let clash = store
            .create_if_free(new_order("bob", 1, OrderState::NoAudit, 11, 1))
            .await
            .unwrap();
        assert_eq!(clash, BookingOutcome::SlotTaken);

        let adjacent = store
            .create_if_free(new_order("bob", 1, OrderState::NoAudit, 12, 1))
            .await
            .unwrap();
        assert!(adjacent.booked().is_some());
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn create_if_free_rejects_empty_windows() {
        let store = InMemoryOrderStore::new();

        let result = store
            .create_if_free(new_order("alice", 1, OrderState::NoAudit, 10, 0))
            .await;

        assert!(matches!(result, Err(StoreError::InvalidWindow(_))));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn clones_share_one_conflict_scope() {
        let store = InMemoryOrderStore::new();
        let other = store.clone();

        let (a, b) = tokio::join!(
            store.create_if_free(new_order("alice", 1, OrderState::NoAudit, 10, 2)),
            other.create_if_free(new_order("bob", 1, OrderState::NoAudit, 10, 2)),
        );

        let booked = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter_map(BookingOutcome::booked)
            .count();
        assert_eq!(booked, 1);
        assert_eq!(other.order_count().await, 1);
    }

    #[tokio::test]
    async fn update_if_free_ignores_own_window_and_never_inserts() {
        let store = InMemoryOrderStore::new();
        let order = store
            .create(new_order("alice", 1, OrderState::Wait, 10, 2))
            .await
            .unwrap();
        store
            .create(new_order("bob", 1, OrderState::NoAudit, 13, 1))
            .await
            .unwrap();

        let mut longer = order.clone();
        longer.hours = 3;
        longer.state = OrderState::NoAudit;
        let outcome = store.update_if_free(longer.clone()).await.unwrap();
        assert_eq!(outcome, BookingOutcome::Booked(longer.clone()));

        let mut clash = longer.clone();
        clash.hours = 4;
        assert_eq!(
            store.update_if_free(clash).await.unwrap(),
            BookingOutcome::SlotTaken
        );

        store.delete_by_id(order.order_id).await.unwrap();
        assert_eq!(
            store.update_if_free(longer).await.unwrap(),
            BookingOutcome::OrderMissing
        );
        assert!(store.find_by_id(order.order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let order = store
            .create(new_order("alice", 1, OrderState::NoAudit, 10, 1))
            .await
            .unwrap();

        store.delete_by_id(order.order_id).await.unwrap();
        store.delete_by_id(order.order_id).await.unwrap();
        store.delete_by_id(OrderId::new(404)).await.unwrap();

        assert!(store.find_by_id(order.order_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_overlapping_skips_rejected_and_adjacent() {
        let store = InMemoryOrderStore::new();
        store
            .create(new_order("alice", 1, OrderState::Reject, 10, 2))
            .await
            .unwrap();
        store
            .create(new_order("alice", 1, OrderState::Finish, 12, 2))
            .await
            .unwrap();
        store
            .create(new_order("alice", 2, OrderState::Wait, 10, 2))
            .await
            .unwrap();

        let window = TimeWindow::new(at(10), at(12)).unwrap();
        let hits = store.find_overlapping(VenueId::new(1), window).await.unwrap();
        assert!(hits.is_empty());

        let window = TimeWindow::new(at(11), at(13)).unwrap();
        let hits = store.find_overlapping(VenueId::new(1), window).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].state, OrderState::Finish);
    }

    #[tokio::test]
    async fn find_by_user_pages_results() {
        let store = InMemoryOrderStore::new();
        for hour in [8, 10, 12] {
            store
                .create(new_order("alice", 1, OrderState::NoAudit, hour, 1))
                .await
                .unwrap();
        }
        store
            .create(new_order("bob", 1, OrderState::NoAudit, 14, 1))
            .await
            .unwrap();

        let page = store
            .find_by_user(UserId::new("alice"), PageRequest::of(0, 2))
            .await
            .unwrap();
        assert_eq!(page.number_of_elements(), 2);
        assert_eq!(page.total, 3);

        let page = store
            .find_by_user(UserId::new("alice"), PageRequest::of(1, 2))
            .await
            .unwrap();
        assert_eq!(page.number_of_elements(), 1);
        assert!(page.is_last());

        let page = store
            .find_by_user(UserId::new("nobody"), PageRequest::of(0, 2))
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn venue_directory_finds_by_name_and_id() {
        let venues = InMemoryVenueDirectory::new();
        venues
            .insert(Venue::new(VenueId::new(1), "court", Money::from_cents(100)))
            .await;

        let by_name = venues.find_venue_by_name("court").await.unwrap().unwrap();
        assert_eq!(by_name.venue_id, VenueId::new(1));
        assert!(venues.find_venue_by_name("pool").await.unwrap().is_none());
        assert!(venues.find_venue_by_id(VenueId::new(1)).await.unwrap().is_some());

        venues.remove(VenueId::new(1)).await;
        assert!(venues.find_venue_by_id(VenueId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_directory_checks_existence() {
        let users = InMemoryUserDirectory::new();
        users.insert("alice").await;

        assert!(users.exists_by_id(&UserId::new("alice")).await.unwrap());
        assert!(!users.exists_by_id(&UserId::new("bob")).await.unwrap());
    }
}
