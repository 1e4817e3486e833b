//! Cross-location availability (read-only).

use serde::{Deserialize, Serialize};

use crate::batch;
use crate::ledger::Ledger;

/// Quantity of one item held at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStock {
    pub location: String,
    pub quantity: i64,
}

impl Ledger {
    /// Total units of `name` across every location and batch, matched
    /// case-insensitively.
    ///
    /// Says nothing about which location would supply an order; allocation is
    /// a separate `issue` against a specific key.
    pub fn availability_by_name(&self, name: &str) -> i64 {
        self.entries()
            .filter(|(key, _)| key.matches_item(name))
            .fold(0i64, |acc, (_, batches)| {
                acc.saturating_add(batch::total_quantity(batches))
            })
    }

    /// Whether `quantity` units of `name` are on hand anywhere.
    pub fn can_fulfill(&self, name: &str, quantity: i64) -> bool {
        self.availability_by_name(name) >= quantity
    }

    /// Per-location breakdown of `name`, in location order.
    pub fn locations_for(&self, name: &str) -> Vec<LocationStock> {
        self.entries()
            .filter(|(key, _)| key.matches_item(name))
            .map(|(key, batches)| LocationStock {
                location: key.location().to_string(),
                quantity: batch::total_quantity(batches),
            })
            .collect()
    }
}
