use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, DomainError, DomainResult, Event};

use crate::batch::{self, Batch, UnitPrice};
use crate::dispenser::{self, ConsumedPortion};
use crate::key::StockKey;

/// Batch ledger: stock keys mapped to arrival-ordered batch sequences.
///
/// Invariants:
/// - a key present in the map always has at least one batch
/// - every batch has a positive quantity
///
/// Batches are appended at the tail on receipt and consumed from the head on
/// issuance. Keys iterate in `(item, location)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<StockKey, VecDeque<Batch>>,
    version: u64,
}

/// Result of a successful receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub key: StockKey,
    pub new_total: i64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive a new batch. Each call adds a distinct lot; batches are never merged.
    ///
    /// All inputs are validated before anything changes.
    pub fn receive(
        &mut self,
        item_name: &str,
        location: &str,
        quantity: i64,
        unit_price: f64,
        min_stock: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Receipt> {
        let cmd = ReceiveBatch {
            item_name: item_name.to_string(),
            location: location.to_string(),
            quantity,
            unit_price,
            min_stock,
            occurred_at,
        };

        let event = match self.handle_receive(&cmd) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(item_name, location, error = %err, "receipt rejected");
                return Err(err);
            }
        };

        let key = event.key.clone();
        self.apply(&LedgerEvent::BatchReceived(event));

        let new_total = self.total_quantity(&key);
        tracing::info!(key = %key, quantity, new_total, "batch received");
        Ok(Receipt { key, new_total })
    }

    /// Drop a key together with every batch it holds.
    pub fn remove(&mut self, key: &StockKey, occurred_at: DateTime<Utc>) -> DomainResult<i64> {
        let event = self.handle_remove(&RemoveKey {
            key: key.clone(),
            occurred_at,
        })?;
        let removed = event.quantity_removed;
        self.apply(&LedgerEvent::StockKeyRemoved(event));

        tracing::info!(key = %key, removed, "stock key removed");
        Ok(removed)
    }

    /// All keys currently held, sorted by item name then location.
    ///
    /// The iterator is lazy and can be cloned to restart it.
    pub fn list_keys(&self) -> impl Iterator<Item = &StockKey> + Clone + '_ {
        self.entries.keys()
    }

    /// Sum of batch quantities for `key`; 0 if absent.
    pub fn total_quantity(&self, key: &StockKey) -> i64 {
        self.entries
            .get(key)
            .map(batch::total_quantity)
            .unwrap_or(0)
    }

    /// Batches of `key`, oldest first.
    pub fn batches(&self, key: &StockKey) -> Option<&VecDeque<Batch>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &StockKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every `(key, batches)` pair in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&StockKey, &VecDeque<Batch>)> + '_ {
        self.entries.iter()
    }

    pub(crate) fn batches_mut(&mut self, key: &StockKey) -> Option<&mut VecDeque<Batch>> {
        self.entries.get_mut(key)
    }

    pub(crate) fn drop_key(&mut self, key: &StockKey) {
        self.entries.remove(key);
    }
}

/// Command: ReceiveBatch. Carries raw caller input; validated in `handle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveBatch {
    pub item_name: String,
    pub location: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub min_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub key: StockKey,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveKey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveKey {
    pub key: StockKey,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerCommand {
    ReceiveBatch(ReceiveBatch),
    IssueStock(IssueStock),
    RemoveKey(RemoveKey),
}

/// Event: BatchReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceived {
    pub key: StockKey,
    pub batch: Batch,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued. `portions` lists what was drawn, oldest batch first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub key: StockKey,
    pub amount: i64,
    pub portions: Vec<ConsumedPortion>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockKeyRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockKeyRemoved {
    pub key: StockKey,
    pub quantity_removed: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    BatchReceived(BatchReceived),
    StockIssued(StockIssued),
    StockKeyRemoved(StockKeyRemoved),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::BatchReceived(_) => "inventory.batch.received",
            LedgerEvent::StockIssued(_) => "inventory.stock.issued",
            LedgerEvent::StockKeyRemoved(_) => "inventory.key.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::BatchReceived(e) => e.occurred_at,
            LedgerEvent::StockIssued(e) => e.occurred_at,
            LedgerEvent::StockKeyRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::BatchReceived(e) => {
                self.entries
                    .entry(e.key.clone())
                    .or_default()
                    .push_back(e.batch.clone());
            }
            LedgerEvent::StockIssued(e) => {
                dispenser::consume(self, &e.key, e.amount);
            }
            LedgerEvent::StockKeyRemoved(e) => {
                self.drop_key(&e.key);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::ReceiveBatch(cmd) => {
                Ok(vec![LedgerEvent::BatchReceived(self.handle_receive(cmd)?)])
            }
            LedgerCommand::IssueStock(cmd) => {
                Ok(vec![LedgerEvent::StockIssued(self.handle_issue(cmd)?)])
            }
            LedgerCommand::RemoveKey(cmd) => {
                Ok(vec![LedgerEvent::StockKeyRemoved(self.handle_remove(cmd)?)])
            }
        }
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Ledger {
    fn handle_receive(&self, cmd: &ReceiveBatch) -> DomainResult<BatchReceived> {
        let key = StockKey::new(&cmd.item_name, &cmd.location)?;
        let unit_price = UnitPrice::from_decimal(cmd.unit_price)?;
        let batch = Batch::new(cmd.quantity, unit_price, cmd.min_stock, cmd.occurred_at)?;

        if self.total_quantity(&key).checked_add(batch.quantity()).is_none() {
            return Err(DomainError::validation(
                "quantity",
                "would overflow the key total",
            ));
        }

        Ok(BatchReceived {
            key,
            batch,
            occurred_at: cmd.occurred_at,
        })
    }

    pub(crate) fn handle_issue(&self, cmd: &IssueStock) -> DomainResult<StockIssued> {
        if cmd.amount <= 0 {
            return Err(DomainError::validation("amount", "must be positive"));
        }

        let batches = self
            .entries
            .get(&cmd.key)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| DomainError::not_found(cmd.key.to_string()))?;

        let portions = dispenser::plan(batches, cmd.amount)?;

        Ok(StockIssued {
            key: cmd.key.clone(),
            amount: cmd.amount,
            portions,
            occurred_at: cmd.occurred_at,
        })
    }

    fn handle_remove(&self, cmd: &RemoveKey) -> DomainResult<StockKeyRemoved> {
        if !self.contains(&cmd.key) {
            return Err(DomainError::not_found(cmd.key.to_string()));
        }
        Ok(StockKeyRemoved {
            key: cmd.key.clone(),
            quantity_removed: self.total_quantity(&cmd.key),
            occurred_at: cmd.occurred_at,
        })
    }
}
