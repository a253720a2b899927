//! Transaction payloads and the journal entry written for each of them
use crate::store::{Record, RecordKey, RecordKind, Resolve};
use crate::types::TimeStamp;
use rust_decimal::Decimal;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    #[n(0)]
    Setup,
    #[n(1)]
    CreateContract,
    #[n(2)]
    CreateProductionLot,
    #[n(3)]
    CreateBatch,
    #[n(4)]
    GrantCertificate,
    #[n(5)]
    GrantClearance,
    #[n(6)]
    IssueShipment,
    #[n(7)]
    RecordTemperature,
    #[n(8)]
    ReceiveShipment,
    #[n(9)]
    PurchaseBatch,
    #[n(10)]
    PurchaseProducts,
}

/// Journal entry committed atomically with the records a transaction touched.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    #[n(0)]
    pub transaction_id: String, // bech32 encoded uuid7, `tx_` prefix
    #[n(1)]
    pub kind: TransactionKind,
    #[n(2)]
    pub subject: String, // id of the record the transaction is about
    #[n(3)]
    pub timestamp: TimeStamp,
    #[n(4)]
    pub payload_digest: String, // sha256 of the cbor payload
    #[n(5)]
    pub sequence: u64, // commit order
}

impl Record for TransactionRecord {
    fn key(&self) -> RecordKey {
        RecordKey::new(RecordKind::Transaction, self.transaction_id.clone())
    }
}

impl Resolve for TransactionRecord {
    type Target = TransactionRecord;

    fn kind() -> RecordKind {
        RecordKind::Transaction
    }
}

/// Bootstraps a demo network. `timestamp` anchors the seed contract deadline
/// and the seed lot's expiration.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    #[n(0)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct CreateContract {
    #[n(0)]
    pub contract_id: String,
    #[n(1)]
    pub grower: String,
    #[n(2)]
    pub importer: String,
    #[n(3)]
    pub shipper: String,
    #[n(4)]
    pub arrival_deadline: TimeStamp,
    #[n(5)]
    #[cbor(with = "crate::types::decimal")]
    pub unit_price: Decimal,
    #[n(6)]
    #[cbor(with = "crate::types::decimal")]
    pub min_temperature: Decimal,
    #[n(7)]
    #[cbor(with = "crate::types::decimal")]
    pub max_temperature: Decimal,
    #[n(8)]
    #[cbor(with = "crate::types::decimal")]
    pub min_penalty_factor: Decimal,
    #[n(9)]
    #[cbor(with = "crate::types::decimal")]
    pub max_penalty_factor: Decimal,
    #[n(10)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct CreateProductionLot {
    #[n(0)]
    pub production_lot_id: String,
    #[n(1)]
    pub grower: String,
    #[n(2)]
    pub product_type: String,
    #[n(3)]
    pub expiration_date: TimeStamp,
    #[n(4)]
    pub quantity: u64,
    #[n(5)]
    pub contract: String,
    #[n(6)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct CreateBatch {
    #[n(0)]
    pub batch_id: String,
    #[n(1)]
    pub production_lot: String,
    #[n(2)]
    pub quantity: u64,
    #[n(3)]
    pub sold_quantity: u64,
    #[n(4)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct GrantCertificate {
    #[n(0)]
    pub production_lot: String,
    #[n(1)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct GrantClearance {
    #[n(0)]
    pub production_lot: String,
    #[n(1)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct IssueShipment {
    #[n(0)]
    pub production_lot: String,
    #[n(1)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RecordTemperature {
    #[n(0)]
    pub production_lot: String,
    #[n(1)]
    #[cbor(with = "crate::types::decimal")]
    pub centigrade: Decimal,
    #[n(2)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ReceiveShipment {
    #[n(0)]
    pub production_lot: String,
    #[n(1)]
    pub importer: String,
    #[n(2)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct PurchaseBatch {
    #[n(0)]
    pub batch: String,
    #[n(1)]
    pub supermarket: String,
    #[n(2)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct PurchaseProducts {
    #[n(0)]
    pub product_id: String,
    #[n(1)]
    pub batch: String,
    #[n(2)]
    pub consumer: String,
    #[n(3)]
    pub quantity: u64,
    #[n(4)]
    pub timestamp: TimeStamp,
}
