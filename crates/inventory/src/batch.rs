use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ValueObject};

/// Unit price in smallest currency unit (cents).
///
/// Built from a decimal amount rounded to two places; must stay above zero
/// after rounding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct UnitPrice(u64);

impl UnitPrice {
    pub fn from_cents(cents: u64) -> DomainResult<Self> {
        if cents == 0 {
            return Err(DomainError::validation(
                "unit_price",
                "must be greater than zero",
            ));
        }
        Ok(Self(cents))
    }

    /// Round a decimal price (e.g. `12.345`) to cents.
    pub fn from_decimal(price: f64) -> DomainResult<Self> {
        if !price.is_finite() || price <= 0.0 {
            return Err(DomainError::validation(
                "unit_price",
                "must be greater than zero",
            ));
        }

        let cents = (price * 100.0).round();
        if cents < 1.0 {
            return Err(DomainError::validation(
                "unit_price",
                "rounds to zero at two decimal places",
            ));
        }
        if cents > u64::MAX as f64 {
            return Err(DomainError::validation("unit_price", "is too large"));
        }

        Ok(Self(cents as u64))
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Value of `quantity` units at this price, in cents.
    pub fn times(self, quantity: i64) -> u64 {
        if quantity <= 0 {
            return 0;
        }
        (quantity as u64).saturating_mul(self.0)
    }
}

impl ValueObject for UnitPrice {}

impl TryFrom<u64> for UnitPrice {
    type Error = DomainError;

    fn try_from(cents: u64) -> Result<Self, Self::Error> {
        Self::from_cents(cents)
    }
}

impl From<UnitPrice> for u64 {
    fn from(price: UnitPrice) -> Self {
        price.0
    }
}

impl core::fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// One received lot of an item at a location.
///
/// Everything but `quantity` is fixed at receipt. Quantity only goes down,
/// and a batch is dropped from the ledger once it reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BatchParts", into = "BatchParts")]
pub struct Batch {
    quantity: i64,
    unit_price: UnitPrice,
    /// Replenishment threshold of the item, as given with this receipt.
    min_stock: i64,
    received_at: DateTime<Utc>,
}

/// Serialized shape of a [`Batch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchParts {
    pub quantity: i64,
    pub unit_price: UnitPrice,
    pub min_stock: i64,
    pub received_at: DateTime<Utc>,
}

impl TryFrom<BatchParts> for Batch {
    type Error = DomainError;

    fn try_from(parts: BatchParts) -> Result<Self, Self::Error> {
        Self::new(
            parts.quantity,
            parts.unit_price,
            parts.min_stock,
            parts.received_at,
        )
    }
}

impl From<Batch> for BatchParts {
    fn from(batch: Batch) -> Self {
        Self {
            quantity: batch.quantity,
            unit_price: batch.unit_price,
            min_stock: batch.min_stock,
            received_at: batch.received_at,
        }
    }
}

/// Sum of batch quantities, saturating at `i64::MAX`.
pub fn total_quantity<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> i64 {
    batches
        .into_iter()
        .fold(0i64, |acc, b| acc.saturating_add(b.quantity))
}

impl Batch {
    pub fn new(
        quantity: i64,
        unit_price: UnitPrice,
        min_stock: i64,
        received_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity", "must be positive"));
        }
        if min_stock < 0 {
            return Err(DomainError::validation("min_stock", "cannot be negative"));
        }
        Ok(Self {
            quantity,
            unit_price,
            min_stock,
            received_at,
        })
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> UnitPrice {
        self.unit_price
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn value(&self) -> u64 {
        self.unit_price.times(self.quantity)
    }

    /// Remove `amount` units. Caller guarantees `0 < amount < quantity`.
    pub(crate) fn take(&mut self, amount: i64) {
        debug_assert!(amount > 0 && amount < self.quantity);
        self.quantity -= amount;
    }
}
