//! Shared types for the venue booking engine.

mod money;
mod order;
mod page;
mod state;
mod types;
mod window;

pub use money::Money;
pub use order::{NewOrder, Order, Venue};
pub use page::{Page, PageRequest};
pub use state::{OrderState, UnknownStateCode};
pub use types::{OrderId, UserId, VenueId};
pub use window::{TimeWindow, WindowError};
