use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ValueObject};

/// Identity of one ledger entry: an item stored at a location.
///
/// Both parts are trimmed and must be non-empty. Equality, ordering and hashing
/// use the upper-cased forms, so `"widget" @ "a1"` and `"Widget" @ "A1"` are the
/// same key. The trimmed spelling is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StockKeyParts", into = "StockKeyParts")]
pub struct StockKey {
    item_name: String,
    location: String,
    item_norm: String,
    location_norm: String,
}

/// Serialized shape of a [`StockKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockKeyParts {
    pub item_name: String,
    pub location: String,
}

impl StockKey {
    pub fn new(item_name: &str, location: &str) -> DomainResult<Self> {
        let item_name = item_name.trim();
        let location = location.trim();

        if item_name.is_empty() {
            return Err(DomainError::validation("item_name", "cannot be empty"));
        }
        if location.is_empty() {
            return Err(DomainError::validation("location", "cannot be empty"));
        }

        Ok(Self {
            item_norm: normalize(item_name),
            location_norm: normalize(location),
            item_name: item_name.to_string(),
            location: location.to_string(),
        })
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Case-normalized item name, used for cross-location grouping.
    pub fn item_norm(&self) -> &str {
        &self.item_norm
    }

    /// Whether this key refers to `name`, ignoring case and surrounding space.
    pub fn matches_item(&self, name: &str) -> bool {
        normalize(name.trim()) == self.item_norm
    }
}

pub(crate) fn normalize(s: &str) -> String {
    s.to_uppercase()
}

impl PartialEq for StockKey {
    fn eq(&self, other: &Self) -> bool {
        self.item_norm == other.item_norm && self.location_norm == other.location_norm
    }
}

impl Eq for StockKey {}

impl Hash for StockKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item_norm.hash(state);
        self.location_norm.hash(state);
    }
}

impl PartialOrd for StockKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StockKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item_norm
            .cmp(&other.item_norm)
            .then_with(|| self.location_norm.cmp(&other.location_norm))
    }
}

impl ValueObject for StockKey {}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} @ {}", self.item_name, self.location)
    }
}

impl TryFrom<StockKeyParts> for StockKey {
    type Error = DomainError;

    fn try_from(parts: StockKeyParts) -> Result<Self, Self::Error> {
        Self::new(&parts.item_name, &parts.location)
    }
}

impl From<StockKey> for StockKeyParts {
    fn from(key: StockKey) -> Self {
        Self {
            item_name: key.item_name,
            location: key.location,
        }
    }
}
