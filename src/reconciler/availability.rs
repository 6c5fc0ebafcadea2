use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{BookingDuration, TimeSlot};

/// Free/taken flag per slot timestamp for one venue and one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailabilityMap(BTreeMap<i64, bool>);

impl AvailabilityMap {
    /// Unknown timestamps count as taken.
    pub fn is_free(&self, timestamp: i64) -> bool {
        self.0.get(&timestamp).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, bool)> + '_ {
        self.0.iter().map(|(ts, free)| (*ts, *free))
    }
}

impl FromIterator<(i64, bool)> for AvailabilityMap {
    fn from_iter<I: IntoIterator<Item = (i64, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// True iff `start` is one of `slots` and it plus the following
/// `duration - 1` slots of the same day are all free. Blocks never run past
/// the last slot of the day.
pub fn is_contiguous_block_free(
    start: i64,
    duration: BookingDuration,
    slots: &[TimeSlot],
    availability: &AvailabilityMap,
) -> bool {
    let Some(index) = slots.iter().position(|slot| slot.timestamp == start) else {
        return false;
    };

    let hours = usize::from(duration.hours());
    match slots.get(index..index + hours) {
        Some(block) => block.iter().all(|slot| availability.is_free(slot.timestamp)),
        None => false,
    }
}
