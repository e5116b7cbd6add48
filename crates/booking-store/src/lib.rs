//! Order, venue and user stores consumed by the booking engine.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryUserDirectory, InMemoryVenueDirectory};
pub use postgres::PostgresStore;
pub use query::OrderQuery;
pub use store::{BookingOutcome, OrderStore, OrderStoreExt, UserDirectory, VenueDirectory};
