//! Half-open booking windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`TimeWindow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The window does not cover any time.
    #[error("window start {start} is not before end {end}")]
    Empty {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The duration is zero, negative, or too large to represent.
    #[error("invalid duration: {hours} hours")]
    InvalidHours { hours: i64 },
}

/// The interval `[start, end)` occupied by an order.
///
/// Windows that share only an endpoint do not overlap, so back-to-back
/// bookings of the same venue are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates the window `[start, start + hours)`.
    pub fn from_hours(start: DateTime<Utc>, hours: i64) -> Result<Self, WindowError> {
        if hours <= 0 {
            return Err(WindowError::InvalidHours { hours });
        }
        let end = Duration::try_hours(hours)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or(WindowError::InvalidHours { hours })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open overlap test: `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_windows() {
        assert!(matches!(
            TimeWindow::new(at(10), at(10)),
            Err(WindowError::Empty { .. })
        ));
        assert!(TimeWindow::new(at(11), at(10)).is_err());
    }

    #[test]
    fn rejects_non_positive_hours() {
        assert_eq!(
            TimeWindow::from_hours(at(10), 0),
            Err(WindowError::InvalidHours { hours: 0 })
        );
        assert_eq!(
            TimeWindow::from_hours(at(10), -1),
            Err(WindowError::InvalidHours { hours: -1 })
        );
    }

    #[test]
    fn from_hours_sets_end() {
        let window = TimeWindow::from_hours(at(10), 2).unwrap();
        assert_eq!(window.start(), at(10));
        assert_eq!(window.end(), at(12));
    }

    #[test]
    fn back_to_back_windows_do_not_overlap() {
        let first = TimeWindow::new(at(9), at(11)).unwrap();
        let second = TimeWindow::new(at(11), at(13)).unwrap();
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn partial_and_nested_windows_overlap() {
        let base = TimeWindow::new(at(9), at(12)).unwrap();
        let partial = TimeWindow::new(at(11), at(14)).unwrap();
        let nested = TimeWindow::new(at(10), at(11)).unwrap();
        assert!(base.overlaps(&partial));
        assert!(partial.overlaps(&base));
        assert!(base.overlaps(&nested));
        assert!(nested.overlaps(&base));
    }
}
