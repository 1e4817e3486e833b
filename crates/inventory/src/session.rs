//! Session lifecycle: inactivity-based expiry of the ledger.
//!
//! A session owns exactly one ledger. Every interaction first evaluates the
//! idle time since the previous one: past the timeout the ledger is replaced by
//! an empty one, otherwise the timer is refreshed. Only then does the command
//! run. Expiry is self-healing; there is no terminal state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Clock, DomainResult, SystemClock};

use crate::config::SessionConfig;
use crate::dispenser::Issuance;
use crate::key::StockKey;
use crate::ledger::{Ledger, Receipt};
use crate::replenishment::{KeyValuation, Shortfall, ValuationSummary};

/// Outcome of evaluating the session clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// The ledger was wiped by this interaction.
    pub expired: bool,
    /// Seconds left before the session would expire. After a reset this is
    /// the full timeout.
    pub remaining_seconds: i64,
}

#[derive(Debug)]
pub struct Session<C: Clock = SystemClock> {
    ledger: Ledger,
    last_activity: DateTime<Utc>,
    last_status: SessionStatus,
    config: SessionConfig,
    clock: C,
}

impl Session<SystemClock> {
    /// Empty session on the wall clock, configured from the environment.
    pub fn from_env() -> Self {
        Self::new(SessionConfig::from_env(), SystemClock)
    }
}

impl<C: Clock> Session<C> {
    pub fn new(config: SessionConfig, clock: C) -> Self {
        Self::with_seed(Ledger::new(), config, clock)
    }

    /// Start a session holding `seed`; the timer starts now.
    pub fn with_seed(seed: Ledger, config: SessionConfig, clock: C) -> Self {
        let now = clock.now();
        Self {
            ledger: seed,
            last_activity: now,
            last_status: SessionStatus {
                expired: false,
                remaining_seconds: config.timeout_seconds,
            },
            config,
            clock,
        }
    }

    /// Evaluate expiry at `now` and record the interaction.
    ///
    /// A `now` earlier than the last activity counts as zero elapsed time.
    pub fn tick(&mut self, now: DateTime<Utc>) -> SessionStatus {
        let elapsed = (now - self.last_activity).max(Duration::zero());
        self.last_activity = now;

        let status = if elapsed > self.config.timeout() {
            let dropped_keys = self.ledger.len();
            self.ledger = Ledger::new();
            tracing::info!(
                idle_secs = elapsed.num_seconds(),
                dropped_keys,
                "session expired; ledger reset"
            );
            SessionStatus {
                expired: true,
                remaining_seconds: self.config.timeout_seconds,
            }
        } else {
            SessionStatus {
                expired: false,
                remaining_seconds: self.config.timeout_seconds - elapsed.num_seconds(),
            }
        };

        self.last_status = status;
        status
    }

    /// `tick` at the session clock's current time. Returns that time.
    fn interact(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        self.tick(now);
        now
    }

    pub fn receive(
        &mut self,
        item_name: &str,
        location: &str,
        quantity: i64,
        unit_price: f64,
        min_stock: i64,
    ) -> DomainResult<Receipt> {
        let now = self.interact();
        self.ledger
            .receive(item_name, location, quantity, unit_price, min_stock, now)
    }

    pub fn issue(
        &mut self,
        item_name: &str,
        location: &str,
        amount: i64,
    ) -> DomainResult<Issuance> {
        let now = self.interact();
        let key = StockKey::new(item_name, location)?;
        self.ledger.issue(&key, amount, now)
    }

    /// Drop a key and all of its batches. Returns the quantity removed.
    pub fn remove(&mut self, item_name: &str, location: &str) -> DomainResult<i64> {
        let now = self.interact();
        let key = StockKey::new(item_name, location)?;
        self.ledger.remove(&key, now)
    }

    pub fn list_keys(&mut self) -> impl Iterator<Item = &StockKey> + Clone + '_ {
        self.interact();
        self.ledger.list_keys()
    }

    pub fn total_quantity(&mut self, item_name: &str, location: &str) -> DomainResult<i64> {
        self.interact();
        let key = StockKey::new(item_name, location)?;
        Ok(self.ledger.total_quantity(&key))
    }

    pub fn availability_by_name(&mut self, item_name: &str) -> i64 {
        self.interact();
        self.ledger.availability_by_name(item_name)
    }

    pub fn can_fulfill(&mut self, item_name: &str, quantity: i64) -> bool {
        self.interact();
        self.ledger.can_fulfill(item_name, quantity)
    }

    pub fn shortfall_report(&mut self) -> Vec<Shortfall> {
        self.interact();
        self.ledger.shortfall_report()
    }

    pub fn valuation(&mut self) -> Vec<KeyValuation> {
        self.interact();
        self.ledger.valuation()
    }

    pub fn valuation_summary(&mut self) -> ValuationSummary {
        self.interact();
        self.ledger.valuation_summary()
    }

    /// Status produced by the most recent interaction.
    pub fn last_status(&self) -> SessionStatus {
        self.last_status
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read the ledger without counting as an interaction.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stockroom_core::ManualClock;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn session() -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::new(t0());
        (Session::new(SessionConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn tick_within_timeout_refreshes_and_reports_remaining() {
        let (mut session, _clock) = session();
        session.receive("Widget", "A1", 5, 1.0, 0).unwrap();

        let status = session.tick(t0() + Duration::seconds(45));
        assert_eq!(
            status,
            SessionStatus {
                expired: false,
                remaining_seconds: 75,
            }
        );
        assert_eq!(session.ledger().len(), 1);
        assert_eq!(session.last_activity(), t0() + Duration::seconds(45));
    }

    #[test]
    fn tick_exactly_at_timeout_keeps_ledger() {
        let (mut session, _clock) = session();
        session.receive("Widget", "A1", 5, 1.0, 0).unwrap();

        let status = session.tick(t0() + Duration::seconds(120));
        assert!(!status.expired);
        assert_eq!(status.remaining_seconds, 0);
        assert_eq!(session.ledger().len(), 1);
    }

    #[test]
    fn tick_past_timeout_resets_ledger() {
        let (mut session, _clock) = session();
        session.receive("Widget", "A1", 5, 1.0, 0).unwrap();

        let status = session.tick(t0() + Duration::seconds(121));
        assert!(status.expired);
        assert_eq!(status.remaining_seconds, 120);
        assert!(session.ledger().is_empty());
        assert_eq!(session.ledger().list_keys().count(), 0);
    }

    #[test]
    fn activity_keeps_session_alive() {
        let (mut session, clock) = session();
        session.receive("Widget", "A1", 5, 1.0, 0).unwrap();

        for _ in 0..5 {
            clock.advance_secs(100);
            assert_eq!(session.availability_by_name("widget"), 5);
            assert!(!session.last_status().expired);
        }
    }

    #[test]
    fn expiry_check_runs_before_command() {
        let (mut session, clock) = session();
        session.receive("Widget", "A1", 5, 1.0, 0).unwrap();

        clock.advance_secs(121);
        let err = session.issue("Widget", "A1", 1).unwrap_err();
        assert!(matches!(err, stockroom_core::DomainError::NotFound(_)));
        assert!(session.last_status().expired);

        // The fresh ledger accepts new work straight away.
        let receipt = session.receive("Widget", "A1", 2, 1.0, 0).unwrap();
        assert_eq!(receipt.new_total, 2);
        assert!(!session.last_status().expired);
    }

    #[test]
    fn clock_skew_counts_as_no_idle_time() {
        let (mut session, _clock) = session();
        let status = session.tick(t0() - Duration::seconds(30));
        assert!(!status.expired);
        assert_eq!(status.remaining_seconds, 120);
    }

    #[test]
    fn seeded_session_and_custom_timeout() {
        let mut seed = Ledger::new();
        seed.receive("Laptop", "Main", 3, 999.99, 1, t0()).unwrap();
        seed.receive("Monitor", "Main", 2, 149.5, 1, t0()).unwrap();

        let clock = ManualClock::new(t0());
        let mut session =
            Session::with_seed(seed, SessionConfig::with_timeout_seconds(10), clock.clone());

        let keys: Vec<String> = session.list_keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["Laptop @ Main", "Monitor @ Main"]);

        clock.advance_secs(11);
        assert!(session.shortfall_report().is_empty());
        assert!(session.last_status().expired);
        assert_eq!(session.valuation_summary().total_keys, 0);
    }

    #[test]
    fn session_operations_round_out_the_workflow() {
        let (mut session, clock) = session();
        session.receive("Widget", "A1", 10, 1.0, 10).unwrap();
        session.receive("Widget", "B2", 5, 2.0, 10).unwrap();

        clock.advance_secs(5);
        assert!(session.can_fulfill("WIDGET", 15));

        let issuance = session.issue("widget", "a1", 7).unwrap();
        assert_eq!(issuance.new_total, 3);
        assert_eq!(session.total_quantity("Widget", "A1").unwrap(), 3);

        let report = session.shortfall_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].available, 8);
        assert_eq!(report[0].deficit, 2);

        assert_eq!(session.remove("Widget", "B2").unwrap(), 5);
        assert_eq!(session.valuation().len(), 1);

        let err = session.total_quantity("", "A1").unwrap_err();
        assert_eq!(err.field(), Some("item_name"));
    }
}
