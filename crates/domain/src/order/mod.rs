//! Reservation orders: conflict checking, validation and lifecycle.

mod conflict;
mod service;
mod transition;
mod validation;
mod view;

pub use conflict::ConflictChecker;
pub use service::OrderService;
pub use transition::Transition;
pub use validation::{BookingRequest, Rejection, ValidBooking, validate_booking};
pub use view::OrderView;

use common::{OrderId, OrderState};
use thiserror::Error;

/// Errors raised by the admin transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// No order with this ID exists.
    #[error("order does not exist: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// Order is not in the state the transition starts from.
    #[error(
        "cannot {action} order {order_id}: {} (current state {current_state}, required {required_state})",
        refusal_reason(.required_state)
    )]
    InvalidStateTransition {
        order_id: OrderId,
        action: &'static str,
        current_state: OrderState,
        required_state: OrderState,
    },
}

impl OrderError {
    /// The human-readable reason shown to end users.
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::OrderNotFound { .. } => "order does not exist",
            OrderError::InvalidStateTransition { required_state, .. } => {
                refusal_reason(required_state)
            }
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderError::OrderNotFound { order_id }
            | OrderError::InvalidStateTransition { order_id, .. } => *order_id,
        }
    }
}

fn refusal_reason(required_state: &OrderState) -> &'static str {
    match required_state {
        OrderState::NoAudit => "order is not awaiting audit",
        OrderState::Wait => "order is not waiting",
        OrderState::Finish | OrderState::Reject => "order is already closed",
    }
}
