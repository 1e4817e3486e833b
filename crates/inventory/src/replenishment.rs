//! Replenishment analysis and inventory valuation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::batch;
use crate::key::StockKey;
use crate::ledger::Ledger;

/// An item whose on-hand quantity is below its minimum-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Item name as spelled on the first key encountered.
    pub item: String,
    pub available: i64,
    pub threshold: i64,
    pub deficit: i64,
}

/// Quantity and value held under one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuation {
    pub key: StockKey,
    pub quantity: i64,
    /// Σ quantity × unit price over the key's batches, in cents.
    pub total_value: u64,
}

/// Summary of the whole ledger's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub total_keys: usize,
    pub total_quantity: i64,
    pub total_value: u64,
}

struct ItemGroup {
    item: String,
    available: i64,
    threshold: i64,
}

impl Ledger {
    /// Items below their minimum stock, in discovery order.
    ///
    /// Batches are grouped by item name regardless of location. The threshold
    /// of a group is the `min_stock` of the first batch met while walking keys
    /// in ledger order; later batches do not override it.
    pub fn shortfall_report(&self) -> Vec<Shortfall> {
        let mut groups: Vec<ItemGroup> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for (key, batches) in self.entries() {
            let Some(first) = batches.front() else {
                continue;
            };
            let quantity = batch::total_quantity(batches);

            match index.get(key.item_norm()) {
                Some(&i) => {
                    groups[i].available = groups[i].available.saturating_add(quantity);
                }
                None => {
                    index.insert(key.item_norm(), groups.len());
                    groups.push(ItemGroup {
                        item: key.item_name().to_string(),
                        available: quantity,
                        threshold: first.min_stock(),
                    });
                }
            }
        }

        let report: Vec<Shortfall> = groups
            .into_iter()
            .filter(|g| g.available < g.threshold)
            .map(|g| Shortfall {
                deficit: g.threshold - g.available,
                item: g.item,
                available: g.available,
                threshold: g.threshold,
            })
            .collect();

        if !report.is_empty() {
            tracing::debug!(items = report.len(), "shortfall detected");
        }
        report
    }

    /// Quantity and value per key, in key order.
    pub fn valuation(&self) -> Vec<KeyValuation> {
        self.entries()
            .map(|(key, batches)| KeyValuation {
                key: key.clone(),
                quantity: batch::total_quantity(batches),
                total_value: batches
                    .iter()
                    .fold(0u64, |acc, b| acc.saturating_add(b.value())),
            })
            .collect()
    }

    pub fn valuation_summary(&self) -> ValuationSummary {
        let items = self.valuation();
        ValuationSummary {
            total_keys: items.len(),
            total_quantity: items
                .iter()
                .fold(0i64, |acc, v| acc.saturating_add(v.quantity)),
            total_value: items
                .iter()
                .fold(0u64, |acc, v| acc.saturating_add(v.total_value)),
        }
    }
}
