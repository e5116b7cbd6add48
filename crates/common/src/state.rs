//! Order lifecycle states.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The state of an order in its approval lifecycle.
///
/// State transitions:
/// ```text
/// NoAudit ──confirm──► Wait ──finish──► Finish
///    │
///    └──reject──► Reject
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Submitted, awaiting admin review.
    #[default]
    NoAudit,

    /// Approved, awaiting the booked slot.
    Wait,

    /// The booking took place (terminal state).
    Finish,

    /// Denied by an admin (terminal state).
    Reject,
}

/// Raised when a stored state code does not name a known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown order state code: {0}")]
pub struct UnknownStateCode(pub i16);

impl OrderState {
    /// Every state, in storage-code order.
    pub const ALL: [OrderState; 4] = [
        OrderState::NoAudit,
        OrderState::Wait,
        OrderState::Finish,
        OrderState::Reject,
    ];

    /// Returns true if an order in this state blocks its window for other orders.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, OrderState::Reject)
    }

    /// Returns true if an admin has approved the order.
    pub fn is_audited(&self) -> bool {
        matches!(self, OrderState::Wait | OrderState::Finish)
    }

    /// Returns the storage code of this state.
    pub fn code(&self) -> i16 {
        match self {
            OrderState::NoAudit => 0,
            OrderState::Wait => 1,
            OrderState::Finish => 2,
            OrderState::Reject => 3,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::NoAudit => "NoAudit",
            OrderState::Wait => "Wait",
            OrderState::Finish => "Finish",
            OrderState::Reject => "Reject",
        }
    }
}

impl TryFrom<i16> for OrderState {
    type Error = UnknownStateCode;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OrderState::NoAudit),
            1 => Ok(OrderState::Wait),
            2 => Ok(OrderState::Finish),
            3 => Ok(OrderState::Reject),
            other => Err(UnknownStateCode(other)),
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
