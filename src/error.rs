//! Error taxonomy for record validation and lifecycle transitions
use crate::store::RecordKind;
use rust_decimal::Decimal;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyId(&'static str),
    #[error("{0} is not set")]
    MissingField(&'static str),
    #[error("unit price must be positive, got {0}")]
    NonPositiveUnitPrice(Decimal),
    #[error("minimum temperature {min} exceeds maximum temperature {max}")]
    InvertedTemperatureRange { min: Decimal, max: Decimal },
    #[error("{field} must not be negative, got {value}")]
    NegativeValue { field: &'static str, value: Decimal },
    #[error("sold quantity {sold} exceeds batch quantity {quantity}")]
    SoldExceedsQuantity { sold: u64, quantity: u64 },
    #[error("{0} must be greater than zero")]
    ZeroQuantity(&'static str),
    #[error("amount overflowed while computing {0}")]
    AmountOverflow(&'static str),
    #[error("invalid calendar date")]
    InvalidDate,
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} `{id}` not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("{kind} `{id}` rejected transition: {reason}")]
    InvalidTransition {
        kind: RecordKind,
        id: String,
        reason: String,
    },
    #[error("{kind} `{id}` already exists")]
    DuplicateKey { kind: RecordKind, id: String },
    #[error("{kind} `{id}` was modified by another transaction")]
    StaleRecord { kind: RecordKind, id: String },
    #[error("record codec failure: {0}")]
    Codec(String),
    #[error("failed to generate transaction id: {0}")]
    Identifier(String),
    #[error(transparent)]
    Storage(#[from] sled::Error),
}

impl LedgerError {
    pub(crate) fn invalid_transition(
        kind: RecordKind,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
