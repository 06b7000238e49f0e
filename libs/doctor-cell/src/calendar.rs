//! Slot calendar generator: the rolling booking window and the canonical
//! slot set. Pure date arithmetic, no I/O.

use chrono::{Duration, NaiveDate};

use crate::models::{SlotDefinition, SlotKey};

/// Length of the rolling booking window, today inclusive.
pub const BOOKING_HORIZON_DAYS: i64 = 7;

/// The system-wide slot set. Two disjoint clock ranges per day; identical
/// for every doctor and department.
pub const SLOT_DEFINITIONS: [SlotDefinition; 2] = [
    SlotDefinition { key: SlotKey::Morning, label: "08:00 - 12:00" },
    SlotDefinition { key: SlotKey::Evening, label: "16:00 - 20:00" },
];

pub fn slot_label(slot: SlotKey) -> &'static str {
    match slot {
        SlotKey::Morning => SLOT_DEFINITIONS[0].label,
        SlotKey::Evening => SLOT_DEFINITIONS[1].label,
    }
}

/// The ordered booking window: exactly `BOOKING_HORIZON_DAYS` consecutive
/// dates starting at `start` inclusive.
pub fn booking_window(start: NaiveDate) -> Vec<NaiveDate> {
    (0..BOOKING_HORIZON_DAYS)
        .map(|offset| start + Duration::days(offset))
        .collect()
}

pub fn is_within_booking_window(start: NaiveDate, date: NaiveDate) -> bool {
    date >= start && date < start + Duration::days(BOOKING_HORIZON_DAYS)
}

/// Every (date, slot) pair in the window, in calendar order.
pub fn candidate_slots(start: NaiveDate) -> Vec<(NaiveDate, SlotKey)> {
    booking_window(start)
        .into_iter()
        .flat_map(|date| SLOT_DEFINITIONS.iter().map(move |def| (date, def.key)))
        .collect()
}
