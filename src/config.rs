//! Network configuration
use chrono::Duration;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Reject shipment transitions taken out of order (receiving a lot that
    /// was never issued, recording temperatures outside transit, granting a
    /// certificate twice). Off reproduces the permissive behaviour of simple
    /// field assignment. Quantity checks apply either way.
    pub enforce_transition_guards: bool,
    /// Opening balance of every participant created by `setup`.
    pub seed_balance: Decimal,
    /// Seed contract deadline, relative to the setup timestamp.
    pub seed_delivery_window: Duration,
    /// Seed lot expiration, relative to the setup timestamp.
    pub seed_shelf_life: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enforce_transition_guards: true,
            seed_balance: Decimal::from(1000),
            seed_delivery_window: Duration::days(1),
            seed_shelf_life: Duration::days(10),
        }
    }
}

impl NetworkConfig {
    pub fn permissive() -> Self {
        Self {
            enforce_transition_guards: false,
            ..Self::default()
        }
    }
    pub fn with_seed_balance(mut self, balance: Decimal) -> Self {
        self.seed_balance = balance;
        self
    }
}
