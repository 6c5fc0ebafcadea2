use serde::{Deserialize, Serialize};

/// One hour-aligned bookable unit of a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Local wall-clock start, `HH:MM`.
    pub label: String,
    /// Unix epoch seconds.
    pub timestamp: i64,
}
