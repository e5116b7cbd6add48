//! Admin-driven lifecycle transitions.

use common::{Order, OrderId, OrderState};

use super::OrderError;

/// A state change an admin can apply to an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Approve an order awaiting audit.
    Confirm,
    /// Deny an order awaiting audit.
    Reject,
    /// Mark an approved order as having taken place.
    Finish,
}

impl Transition {
    /// The state the order must be in for this transition.
    pub fn required_state(&self) -> OrderState {
        match self {
            Transition::Confirm | Transition::Reject => OrderState::NoAudit,
            Transition::Finish => OrderState::Wait,
        }
    }

    /// The state the order ends up in.
    pub fn target_state(&self) -> OrderState {
        match self {
            Transition::Confirm => OrderState::Wait,
            Transition::Reject => OrderState::Reject,
            Transition::Finish => OrderState::Finish,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Reject => "reject",
            Transition::Finish => "finish",
        }
    }

    /// Checks `order` against the transition and returns its next state.
    pub fn apply(&self, order: &Order) -> Result<OrderState, OrderError> {
        if order.state != self.required_state() {
            return Err(self.refused(order.order_id, order.state));
        }
        Ok(self.target_state())
    }

    /// The error for an order found in `current_state`.
    pub fn refused(&self, order_id: OrderId, current_state: OrderState) -> OrderError {
        OrderError::InvalidStateTransition {
            order_id,
            action: self.action(),
            current_state,
            required_state: self.required_state(),
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.action())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{Money, UserId, VenueId};

    fn order_in(state: OrderState) -> Order {
        Order {
            order_id: OrderId::new(1),
            user_id: UserId::new("alice"),
            venue_id: VenueId::new(1),
            state,
            order_time: Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap(),
            start_time: Utc.with_ymd_and_hms(2030, 6, 1, 10, 0, 0).unwrap(),
            hours: 1,
            total: Money::from_cents(100),
        }
    }

    #[test]
    fn test_no_audit_can_be_confirmed_or_rejected() {
        let order = order_in(OrderState::NoAudit);
        assert_eq!(Transition::Confirm.apply(&order).unwrap(), OrderState::Wait);
        assert_eq!(Transition::Reject.apply(&order).unwrap(), OrderState::Reject);
        assert!(Transition::Finish.apply(&order).is_err());
    }

    #[test]
    fn test_wait_can_only_finish() {
        let order = order_in(OrderState::Wait);
        assert_eq!(Transition::Finish.apply(&order).unwrap(), OrderState::Finish);
        assert!(Transition::Confirm.apply(&order).is_err());
        assert!(Transition::Reject.apply(&order).is_err());
    }

    #[test]
    fn test_terminal_states_refuse_every_transition() {
        for state in [OrderState::Finish, OrderState::Reject] {
            let order = order_in(state);
            for transition in [Transition::Confirm, Transition::Reject, Transition::Finish] {
                assert!(transition.apply(&order).is_err(), "{transition} from {state}");
            }
        }
    }

    #[test]
    fn test_transitions_never_leave_terminal_states() {
        for state in OrderState::ALL {
            for transition in [Transition::Confirm, Transition::Reject, Transition::Finish] {
                if let Ok(next) = transition.apply(&order_in(state)) {
                    assert!(!matches!(state, OrderState::Finish | OrderState::Reject));
                    assert_ne!(next, OrderState::NoAudit);
                }
            }
        }
    }

    #[test]
    fn test_refusal_carries_states() {
        let err = Transition::Reject
            .apply(&order_in(OrderState::Finish))
            .unwrap_err();
        match err {
            OrderError::InvalidStateTransition {
                action,
                current_state,
                required_state,
                ..
            } => {
                assert_eq!(action, "reject");
                assert_eq!(current_state, OrderState::Finish);
                assert_eq!(required_state, OrderState::NoAudit);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
