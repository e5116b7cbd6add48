//! Domain error types.

use booking_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors returned by the order lifecycle transitions.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in one of the stores.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The transition was refused.
    #[error("Order error: {0}")]
    Order(OrderError),
}

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}

impl DomainError {
    /// Returns the order error, if this is one.
    pub fn as_order_error(&self) -> Option<&OrderError> {
        match self {
            DomainError::Order(e) => Some(e),
            DomainError::Store(_) => None,
        }
    }
}
