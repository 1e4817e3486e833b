//! FIFO issuance.
//!
//! Issuing is two-phase: [`plan`] checks feasibility and computes the portions
//! without touching the ledger, then [`consume`] performs the mutation
//! unconditionally. `consume` is only ever reached through a `StockIssued`
//! event produced by a successful plan.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, DomainError, DomainResult};

use crate::batch::{self, Batch, UnitPrice};
use crate::key::StockKey;
use crate::ledger::{IssueStock, Ledger, LedgerEvent};

/// Units drawn from one batch during an issuance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedPortion {
    pub quantity: i64,
    pub unit_price: UnitPrice,
}

impl ConsumedPortion {
    pub fn value(&self) -> u64 {
        self.unit_price.times(self.quantity)
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuance {
    pub key: StockKey,
    /// Portions in the order they were drawn (oldest batch first).
    pub portions: Vec<ConsumedPortion>,
    /// Remaining total for the key; 0 when the key was removed.
    pub new_total: i64,
}

impl Issuance {
    pub fn quantity(&self) -> i64 {
        self.portions.iter().map(|p| p.quantity).sum()
    }

    /// Cost of the issued goods in cents.
    pub fn cost(&self) -> u64 {
        self.portions
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.value()))
    }
}

/// Dry run: the portions an issuance of `amount` would draw, oldest first.
///
/// Fails with `InsufficientStock` when the batches hold less than `amount`.
pub fn plan(batches: &VecDeque<Batch>, amount: i64) -> DomainResult<Vec<ConsumedPortion>> {
    let available = batch::total_quantity(batches);
    if amount > available {
        return Err(DomainError::insufficient(amount, available));
    }

    let mut remaining = amount;
    let mut portions = Vec::new();
    for batch in batches {
        if remaining == 0 {
            break;
        }
        let taken = batch.quantity().min(remaining);
        portions.push(ConsumedPortion {
            quantity: taken,
            unit_price: batch.unit_price(),
        });
        remaining -= taken;
    }

    Ok(portions)
}

/// Consume `amount` units of `key` from the head of its batch sequence.
///
/// Assumes a successful [`plan`] for the same state. Whole batches are popped;
/// the last one touched may be left partially consumed. The key is dropped
/// once its sequence is empty.
pub(crate) fn consume(ledger: &mut Ledger, key: &StockKey, amount: i64) {
    let Some(batches) = ledger.batches_mut(key) else {
        return;
    };

    let mut remaining = amount;
    while remaining > 0 {
        let Some(head) = batches.front_mut() else {
            break;
        };
        if head.quantity() <= remaining {
            remaining -= head.quantity();
            batches.pop_front();
        } else {
            head.take(remaining);
            remaining = 0;
        }
    }

    if batches.is_empty() {
        ledger.drop_key(key);
    }
}

impl Ledger {
    /// Issue `amount` units of `key`, oldest batch first.
    ///
    /// Either the whole amount is issued or nothing changes.
    pub fn issue(
        &mut self,
        key: &StockKey,
        amount: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Issuance> {
        let cmd = IssueStock {
            key: key.clone(),
            amount,
            occurred_at,
        };

        let event = match self.handle_issue(&cmd) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(key = %key, amount, error = %err, "issuance rejected");
                return Err(err);
            }
        };

        let portions = event.portions.clone();
        self.apply(&LedgerEvent::StockIssued(event));

        let new_total = self.total_quantity(key);
        tracing::info!(
            key = %key,
            amount,
            batches_touched = portions.len(),
            new_total,
            "stock issued"
        );

        Ok(Issuance {
            key: key.clone(),
            portions,
            new_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn key() -> StockKey {
        StockKey::new("Widget", "A1").unwrap()
    }

    fn cents(c: u64) -> UnitPrice {
        UnitPrice::from_cents(c).unwrap()
    }

    #[test]
    fn issues_oldest_batch_first() {
        let mut ledger = Ledger::new();
        ledger.receive("Widget", "A1", 10, 1.0, 0, t0()).unwrap();
        ledger.receive("Widget", "A1", 5, 2.0, 0, t0()).unwrap();

        let issuance = ledger.issue(&key(), 12, t0()).unwrap();
        assert_eq!(
            issuance.portions,
            vec![
                ConsumedPortion {
                    quantity: 10,
                    unit_price: cents(100),
                },
                ConsumedPortion {
                    quantity: 2,
                    unit_price: cents(200),
                },
            ]
        );
        assert_eq!(issuance.new_total, 3);
        assert_eq!(issuance.quantity(), 12);
        assert_eq!(issuance.cost(), 10 * 100 + 2 * 200);

        let left = ledger.batches(&key()).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].quantity(), 3);
        assert_eq!(left[0].unit_price(), cents(200));
    }

    #[test]
    fn partial_issue_within_head_batch_keeps_it() {
        let mut ledger = Ledger::new();
        ledger.receive("Widget", "A1", 10, 1.0, 0, t0()).unwrap();

        let issuance = ledger.issue(&key(), 4, t0()).unwrap();
        assert_eq!(issuance.portions.len(), 1);
        assert_eq!(issuance.new_total, 6);
        assert_eq!(ledger.batches(&key()).unwrap()[0].quantity(), 6);
    }

    #[test]
    fn issuing_everything_removes_key() {
        let mut ledger = Ledger::new();
        ledger.receive("Widget", "A1", 3, 1.0, 0, t0()).unwrap();
        ledger.receive("Widget", "A1", 4, 1.5, 0, t0()).unwrap();

        let issuance = ledger.issue(&key(), 7, t0()).unwrap();
        assert_eq!(issuance.new_total, 0);
        assert!(!ledger.contains(&key()));
        assert_eq!(ledger.list_keys().count(), 0);
    }

    #[test]
    fn insufficient_stock_leaves_ledger_untouched() {
        let mut ledger = Ledger::new();
        ledger.receive("Widget", "A1", 5, 1.0, 0, t0()).unwrap();
        ledger.receive("Widget", "A1", 3, 1.0, 0, t0()).unwrap();
        let before = ledger.clone();

        let err = ledger.issue(&key(), 9, t0()).unwrap_err();
        assert_eq!(err, DomainError::insufficient(9, 8));
        assert_eq!(ledger, before);
    }

    #[test]
    fn rejects_non_positive_amount_and_unknown_key() {
        let mut ledger = Ledger::new();
        ledger.receive("Widget", "A1", 5, 1.0, 0, t0()).unwrap();

        let err = ledger.issue(&key(), 0, t0()).unwrap_err();
        assert_eq!(err.field(), Some("amount"));

        let other = StockKey::new("Widget", "B2").unwrap();
        let err = ledger.issue(&other, 1, t0()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn plan_is_a_dry_run() {
        let price = cents(50);
        let batches: VecDeque<Batch> = [4, 6]
            .into_iter()
            .map(|q| Batch::new(q, price, 0, t0()).unwrap())
            .collect();

        let portions = plan(&batches, 5).unwrap();
        assert_eq!(portions.iter().map(|p| p.quantity).collect::<Vec<_>>(), vec![4, 1]);
        assert_eq!(batches[0].quantity(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a successful issue reduces the total by exactly the
        /// amount; a failed one changes nothing.
        #[test]
        fn issuance_conserves_quantity(
            receipts in prop::collection::vec((1i64..50, 1u64..10_000), 1..8),
            amount in 1i64..400,
        ) {
            let mut ledger = Ledger::new();
            for (qty, price_cents) in &receipts {
                let price = *price_cents as f64 / 100.0;
                ledger.receive("Widget", "A1", *qty, price, 0, t0()).unwrap();
            }

            let before_total = ledger.total_quantity(&key());
            let before = ledger.clone();

            match ledger.issue(&key(), amount, t0()) {
                Ok(issuance) => {
                    prop_assert_eq!(ledger.total_quantity(&key()), before_total - amount);
                    prop_assert_eq!(issuance.quantity(), amount);
                    prop_assert_eq!(issuance.new_total, before_total - amount);
                    if let Some(batches) = ledger.batches(&key()) {
                        prop_assert!(batches.iter().all(|b| b.quantity() > 0));
                    } else {
                        prop_assert_eq!(amount, before_total);
                    }
                }
                Err(err) => {
                    prop_assert_eq!(err, DomainError::insufficient(amount, before_total));
                    prop_assert_eq!(ledger, before);
                }
            }
        }
    }
}
