//! Reservation order engine.
//!
//! This crate books venues for users and tracks each booking through its
//! approval lifecycle:
//! - Conflict checking over half-open time windows
//! - Fail-quiet submission and update validation
//! - Admin transitions (confirm, reject, finish) with explicit errors
//! - Read-side queries and the order view projection

pub mod clock;
pub mod config;
pub mod error;
pub mod order;
pub mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, LogFormat};
pub use error::DomainError;
pub use order::{
    BookingRequest, ConflictChecker, OrderError, OrderService, OrderView, Rejection, Transition,
    ValidBooking, validate_booking,
};
pub use telemetry::init_tracing;
