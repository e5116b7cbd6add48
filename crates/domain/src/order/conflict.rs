//! Time-conflict detection for venue bookings.

use booking_store::{OrderStore, OrderStoreExt, StoreError};
use common::{OrderId, TimeWindow, VenueId};

/// Decides whether a window on a venue is already taken.
///
/// Every order that is not rejected occupies its window, finished ones
/// included. Windows are half-open so back-to-back bookings pass.
pub struct ConflictChecker<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: OrderStore + ?Sized> ConflictChecker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Returns true if another order already occupies part of `window`.
    ///
    /// `exclude` names an order that never conflicts, used when an order
    /// is rebooked over its own previous window.
    pub async fn has_conflict(
        &self,
        venue_id: VenueId,
        window: TimeWindow,
        exclude: Option<OrderId>,
    ) -> Result<bool, StoreError> {
        let candidates = self.store.find_overlapping(venue_id, window).await?;

        // Re-check locally; the store's own filter may be looser
        let conflict = candidates.iter().find(|order| {
            order.venue_id == venue_id
                && Some(order.order_id) != exclude
                && order.blocks(&window)
        });

        if let Some(order) = conflict {
            tracing::debug!(
                %venue_id,
                %window,
                conflicting_order = %order.order_id,
                state = %order.state,
                "window already occupied"
            );
        }
        Ok(conflict.is_some())
    }
}
