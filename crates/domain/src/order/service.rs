//! Order service providing the booking engine's public operations.

use booking_store::{
    BookingOutcome, OrderStore, OrderStoreExt, StoreError, UserDirectory, VenueDirectory,
};
use chrono::{DateTime, Utc};
use common::{NewOrder, Order, OrderId, OrderState, Page, PageRequest, TimeWindow, UserId, VenueId};

use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;

use super::{
    BookingRequest, ConflictChecker, OrderError, OrderView, Rejection, Transition, ValidBooking,
    validate_booking,
};

/// Service for booking venues and auditing orders.
///
/// Submissions and updates are fail-quiet: a request that does not pass
/// validation returns `Ok(None)` and persists nothing. The admin
/// transitions instead return an explicit [`OrderError`].
///
/// The service keeps no state of its own. Slot exclusivity comes from the
/// order store's conflict-checked writes, so any number of services may
/// share one store.
pub struct OrderService<S, V, U, C = SystemClock> {
    orders: S,
    venues: V,
    users: U,
    clock: C,
}

impl<S, V, U> OrderService<S, V, U>
where
    S: OrderStore,
    V: VenueDirectory,
    U: UserDirectory,
{
    /// Creates a service that reads the system clock.
    pub fn new(orders: S, venues: V, users: U) -> Self {
        Self::with_clock(orders, venues, users, SystemClock)
    }
}

impl<S, V, U, C> OrderService<S, V, U, C>
where
    S: OrderStore,
    V: VenueDirectory,
    U: UserDirectory,
    C: Clock,
{
    /// Creates a service with an explicit time source.
    pub fn with_clock(orders: S, venues: V, users: U, clock: C) -> Self {
        Self {
            orders,
            venues,
            users,
            clock,
        }
    }

    pub fn orders(&self) -> &S {
        &self.orders
    }

    pub fn venues(&self) -> &V {
        &self.venues
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Books `venue_name` for `hours` starting at `start_time`.
    ///
    /// Returns the new order in `NoAudit`, or `None` if the venue or user
    /// is unknown, the start is not in the future, `hours` is not positive,
    /// or the window is already taken.
    #[tracing::instrument(skip(self))]
    pub async fn submit(
        &self,
        venue_name: &str,
        start_time: DateTime<Utc>,
        hours: i64,
        user_id: &UserId,
    ) -> Result<Option<Order>, StoreError> {
        let now = self.clock.now();
        let request = BookingRequest::new(venue_name, start_time, hours, user_id.clone());
        let booking = match validate_booking(&self.venues, &self.users, now, &request).await? {
            Ok(booking) => booking,
            Err(rejection) => return Ok(dropped("submit", rejection)),
        };

        let outcome = self.orders.create_if_free(new_order(booking, now)).await?;
        let Some(order) = settle("submit", outcome) else {
            return Ok(None);
        };

        metrics::counter!("booking_orders_submitted").increment(1);
        tracing::info!(
            order_id = %order.order_id,
            venue_id = %order.venue_id,
            total = %order.total,
            "order submitted"
        );
        Ok(Some(order))
    }

    /// Rebooks an existing order with new parameters.
    ///
    /// Runs the same checks as [`submit`](Self::submit), ignoring the order's
    /// own previous window, and overwrites the order. The order's current
    /// state is not checked; the rewritten order goes back to `NoAudit`.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        order_id: OrderId,
        venue_name: &str,
        start_time: DateTime<Utc>,
        hours: i64,
        user_id: &UserId,
    ) -> Result<Option<Order>, StoreError> {
        let now = self.clock.now();
        let request = BookingRequest::new(venue_name, start_time, hours, user_id.clone());
        let booking = match validate_booking(&self.venues, &self.users, now, &request).await? {
            Ok(booking) => booking,
            Err(rejection) => return Ok(dropped("update", rejection)),
        };

        let rewritten = new_order(booking, now).with_id(order_id);
        let Some(order) = settle("update", self.orders.update_if_free(rewritten).await?) else {
            return Ok(None);
        };

        tracing::info!(%order_id, venue_id = %order.venue_id, "order updated");
        Ok(Some(order))
    }

    /// Returns true if an occupying order on `venue_id` overlaps `window`.
    ///
    /// A read-only snapshot; submissions re-check atomically when writing.
    #[tracing::instrument(skip(self))]
    pub async fn has_conflict(
        &self,
        venue_id: VenueId,
        window: TimeWindow,
    ) -> Result<bool, StoreError> {
        ConflictChecker::new(&self.orders)
            .has_conflict(venue_id, window, None)
            .await
    }

    /// Approves an order awaiting audit.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Transition::Confirm).await
    }

    /// Denies an order awaiting audit.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Transition::Reject).await
    }

    /// Marks an approved order as finished.
    #[tracing::instrument(skip(self))]
    pub async fn finish(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.transition(order_id, Transition::Finish).await
    }

    /// Deletes an order. Missing orders are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<(), StoreError> {
        self.orders.delete_by_id(order_id).await?;
        tracing::info!(%order_id, "order deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        self.orders.find_by_id(order_id).await
    }

    /// One page of a user's orders. Unknown users get an empty page.
    #[tracing::instrument(skip(self))]
    pub async fn find_user_orders(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        self.orders.find_by_user(user_id.clone(), page).await
    }

    /// One page of orders awaiting audit.
    #[tracing::instrument(skip(self))]
    pub async fn find_no_audit_orders(&self, page: PageRequest) -> Result<Page<Order>, StoreError> {
        self.orders.find_by_state(OrderState::NoAudit, page).await
    }

    /// Every audited order that was approved, finished or not. Unpaged.
    #[tracing::instrument(skip(self))]
    pub async fn find_audit_orders(&self) -> Result<Vec<Order>, StoreError> {
        let audited = OrderState::ALL
            .into_iter()
            .filter(OrderState::is_audited)
            .collect();
        self.orders.find_by_states(audited).await
    }

    /// Orders on a venue whose start time lies in `[from, until]`.
    #[tracing::instrument(skip(self))]
    pub async fn find_date_orders(
        &self,
        venue_id: VenueId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        self.orders
            .find_by_venue_starting_between(venue_id, from, until)
            .await
    }

    /// Looks an order up and joins it with its venue's name.
    #[tracing::instrument(skip(self))]
    pub async fn order_view(&self, order_id: OrderId) -> Result<Option<OrderView>, StoreError> {
        let Some(order) = self.orders.find_by_id(order_id).await? else {
            return Ok(None);
        };
        self.view_of(order).await
    }

    /// Joins each order with its venue's name, keeping positions.
    ///
    /// Orders whose venue no longer resolves map to `None`.
    pub async fn order_views(&self, orders: Vec<Order>) -> Result<Vec<Option<OrderView>>, StoreError> {
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.view_of(order).await?);
        }
        Ok(views)
    }

    async fn view_of(&self, order: Order) -> Result<Option<OrderView>, StoreError> {
        let venue = self.venues.find_venue_by_id(order.venue_id).await?;
        Ok(venue.map(|venue| OrderView::new(order, &venue)))
    }

    async fn transition(
        &self,
        order_id: OrderId,
        transition: Transition,
    ) -> Result<Order, DomainError> {
        let result = self.apply_transition(order_id, transition).await;

        match &result {
            Ok(order) => {
                metrics::counter!("booking_order_transitions", "action" => transition.action())
                    .increment(1);
                tracing::info!(%order_id, action = %transition, state = %order.state, "order transitioned");
            }
            Err(e) => {
                metrics::counter!("booking_transition_failures", "action" => transition.action())
                    .increment(1);
                tracing::warn!(%order_id, action = %transition, error = %e, "transition refused");
            }
        }
        result
    }

    async fn apply_transition(
        &self,
        order_id: OrderId,
        transition: Transition,
    ) -> Result<Order, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound { order_id })?;

        let next = transition.apply(&order)?;

        if !self
            .orders
            .transition_state(order_id, order.state, next)
            .await?
        {
            // Someone else moved or deleted the order since we read it
            let err = match self.orders.find_by_id(order_id).await? {
                Some(current) => transition.refused(order_id, current.state),
                None => OrderError::OrderNotFound { order_id },
            };
            return Err(err.into());
        }

        Ok(Order {
            state: next,
            ..order
        })
    }
}

fn new_order(booking: ValidBooking, now: DateTime<Utc>) -> NewOrder {
    NewOrder {
        user_id: booking.user_id,
        venue_id: booking.venue.venue_id,
        state: OrderState::NoAudit,
        order_time: now,
        start_time: booking.window.start(),
        hours: booking.hours,
        total: booking.total,
    }
}

/// Turns a store write outcome into the fail-quiet result.
fn settle(operation: &'static str, outcome: BookingOutcome) -> Option<Order> {
    match outcome {
        BookingOutcome::Booked(order) => Some(order),
        BookingOutcome::SlotTaken => dropped(operation, Rejection::SlotTaken),
        BookingOutcome::OrderMissing => dropped(operation, Rejection::OrderNotFound),
    }
}

fn dropped(operation: &'static str, rejection: Rejection) -> Option<Order> {
    metrics::counter!("booking_orders_rejected_quietly", "reason" => rejection.as_str())
        .increment(1);
    tracing::debug!(operation, reason = %rejection, "booking dropped");
    None
}
