use common::{OrderId, UnknownStateCode, WindowError};
use thiserror::Error;

/// Errors that can occur when interacting with the booking stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An order handed to the store does not cover a valid window.
    #[error("Invalid order window: {0}")]
    InvalidWindow(#[from] WindowError),

    /// A duration does not fit the storage column.
    #[error("Duration out of range: {hours} hours")]
    HoursOutOfRange { hours: u32 },

    /// A stored order could not be mapped back into a valid record.
    #[error("Corrupt order record {order_id}: {reason}")]
    CorruptRecord { order_id: OrderId, reason: String },
}

impl StoreError {
    pub(crate) fn unknown_state(order_id: OrderId, err: UnknownStateCode) -> Self {
        StoreError::CorruptRecord {
            order_id,
            reason: err.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
