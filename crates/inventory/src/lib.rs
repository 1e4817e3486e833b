//! Inventory domain module: a session-scoped batch ledger.
//!
//! Stock is received in batches keyed by `(item, location)`, issued strictly
//! oldest batch first, and analyzed for cross-location availability and
//! replenishment shortfalls. Everything here is deterministic domain logic
//! (no IO, no storage); a [`Session`] wipes its ledger after a period of
//! inactivity.

pub mod availability;
pub mod batch;
pub mod config;
pub mod dispenser;
pub mod key;
pub mod ledger;
pub mod replenishment;
pub mod session;

pub use availability::LocationStock;
pub use batch::{Batch, BatchParts, UnitPrice};
pub use config::{DEFAULT_TIMEOUT_SECONDS, SESSION_TIMEOUT_ENV, SessionConfig};
pub use dispenser::{ConsumedPortion, Issuance};
pub use key::{StockKey, StockKeyParts};
pub use ledger::{
    BatchReceived, IssueStock, Ledger, LedgerCommand, LedgerEvent, Receipt, ReceiveBatch,
    RemoveKey, StockIssued, StockKeyRemoved,
};
pub use replenishment::{KeyValuation, Shortfall, ValuationSummary};
pub use session::{Session, SessionStatus};
