//! Session configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the inactivity timeout, in seconds.
pub const SESSION_TIMEOUT_ENV: &str = "STOCKROOM_SESSION_TIMEOUT_SECS";

/// Inactivity timeout applied when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 120;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which the ledger is wiped. Always positive.
    pub timeout_seconds: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl SessionConfig {
    /// Non-positive values fall back to the default.
    pub fn with_timeout_seconds(timeout_seconds: i64) -> Self {
        if timeout_seconds > 0 {
            Self { timeout_seconds }
        } else {
            Self::default()
        }
    }

    /// Read `STOCKROOM_SESSION_TIMEOUT_SECS`, falling back to the default when
    /// unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(SESSION_TIMEOUT_ENV).ok().as_deref())
    }

    fn from_value(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match raw.trim().parse::<i64>() {
            Ok(secs) if secs > 0 => Self {
                timeout_seconds: secs,
            },
            _ => {
                tracing::warn!(
                    value = raw,
                    default = DEFAULT_TIMEOUT_SECONDS,
                    "invalid {SESSION_TIMEOUT_ENV}; using default"
                );
                Self::default()
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::seconds(self.timeout_seconds)
    }
}
