//! Domain records of the perishable supply network
//!
//! Records reference each other through [`Ref`] values. Resolving a reference
//! is a store read; nothing here holds another record in memory.
use crate::error::ValidationError;
use crate::store::{Record, RecordKey, RecordKind, Ref, Resolve};
use crate::types::TimeStamp;
use rust_decimal::Decimal;

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Role {
    #[n(0)]
    Grower,
    #[n(1)]
    Importer,
    #[n(2)]
    Shipper,
    #[n(3)]
    Supermarket,
    #[n(4)]
    QualityInspector,
    #[n(5)]
    Customs,
    #[n(6)]
    Consumer,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Grower,
        Role::Importer,
        Role::Shipper,
        Role::Supermarket,
        Role::QualityInspector,
        Role::Customs,
        Role::Consumer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Grower => "grower",
            Role::Importer => "importer",
            Role::Shipper => "shipper",
            Role::Supermarket => "supermarket",
            Role::QualityInspector => "quality_inspector",
            Role::Customs => "customs",
            Role::Consumer => "consumer",
        }
    }
}

/// Marker types naming which role a participant reference points at.
pub mod party {
    use super::{Participant, Role};
    use crate::store::{RecordKind, Resolve};

    macro_rules! party_marker {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy, PartialEq, Eq)]
                pub struct $name;

                impl Resolve for $name {
                    type Target = Participant;

                    fn kind() -> RecordKind {
                        RecordKind::Participant(Role::$name)
                    }
                }
            )*
        };
    }

    party_marker!(
        Grower,
        Importer,
        Shipper,
        Supermarket,
        QualityInspector,
        Customs,
        Consumer,
    );
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Address {
    #[n(0)]
    pub country: String,
}

impl Address {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub role: Role,
    #[n(2)]
    pub address: Address,
    // may go negative, the network extends credit
    #[n(3)]
    #[cbor(with = "crate::types::decimal")]
    pub account_balance: Decimal,
}

impl Participant {
    pub fn new(
        role: Role,
        id: impl Into<String>,
        address: Address,
        account_balance: Decimal,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyId("participant id"));
        }
        Ok(Self {
            id,
            role,
            address,
            account_balance,
        })
    }
}

impl Record for Participant {
    fn key(&self) -> RecordKey {
        RecordKey::new(RecordKind::Participant(self.role), self.id.clone())
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub grower: Ref<party::Grower>,
    #[n(2)]
    pub importer: Ref<party::Importer>,
    #[n(3)]
    pub shipper: Ref<party::Shipper>,
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
    // currency per degree below min_temperature, per unit
    #[n(8)]
    #[cbor(with = "crate::types::decimal")]
    pub min_penalty_factor: Decimal,
    // currency per degree above max_temperature, per unit
    #[n(9)]
    #[cbor(with = "crate::types::decimal")]
    pub max_penalty_factor: Decimal,
}

impl Contract {
    pub fn draft(id: impl Into<String>) -> ContractDraft {
        ContractDraft::new(id)
    }

    /// Checks the pricing terms. Run on creation and again before settling.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.unit_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveUnitPrice(self.unit_price));
        }
        if self.min_temperature > self.max_temperature {
            return Err(ValidationError::InvertedTemperatureRange {
                min: self.min_temperature,
                max: self.max_temperature,
            });
        }
        if self.min_penalty_factor < Decimal::ZERO {
            return Err(ValidationError::NegativeValue {
                field: "min penalty factor",
                value: self.min_penalty_factor,
            });
        }
        if self.max_penalty_factor < Decimal::ZERO {
            return Err(ValidationError::NegativeValue {
                field: "max penalty factor",
                value: self.max_penalty_factor,
            });
        }
        Ok(())
    }
}

impl Record for Contract {
    fn key(&self) -> RecordKey {
        RecordKey::new(RecordKind::Contract, self.id.clone())
    }
}

impl Resolve for Contract {
    type Target = Contract;

    fn kind() -> RecordKind {
        RecordKind::Contract
    }
}

// Used for constructing contracts
#[derive(Debug, Default, Clone)]
pub struct ContractDraft {
    id: String,
    grower: Option<String>,
    importer: Option<String>,
    shipper: Option<String>,
    arrival_deadline: Option<TimeStamp>,
    unit_price: Option<Decimal>,
    temperature_range: Option<(Decimal, Decimal)>,
    penalty_factors: Option<(Decimal, Decimal)>,
}

impl ContractDraft {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
    pub fn grower(mut self, id: impl Into<String>) -> Self {
        self.grower = Some(id.into());
        self
    }
    pub fn importer(mut self, id: impl Into<String>) -> Self {
        self.importer = Some(id.into());
        self
    }
    pub fn shipper(mut self, id: impl Into<String>) -> Self {
        self.shipper = Some(id.into());
        self
    }
    pub fn arrival_deadline(mut self, deadline: TimeStamp) -> Self {
        self.arrival_deadline = Some(deadline);
        self
    }
    pub fn unit_price(mut self, price: Decimal) -> Self {
        self.unit_price = Some(price);
        self
    }
    pub fn temperature_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.temperature_range = Some((min, max));
        self
    }
    pub fn penalty_factors(mut self, below_min: Decimal, above_max: Decimal) -> Self {
        self.penalty_factors = Some((below_min, above_max));
        self
    }

    pub fn build(self) -> Result<Contract, ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId("contract id"));
        }
        let grower = required(self.grower, "grower")?;
        let importer = required(self.importer, "importer")?;
        let shipper = required(self.shipper, "shipper")?;
        let arrival_deadline = self
            .arrival_deadline
            .ok_or(ValidationError::MissingField("arrival deadline"))?;
        let unit_price = self
            .unit_price
            .ok_or(ValidationError::MissingField("unit price"))?;
        let (min_temperature, max_temperature) = self
            .temperature_range
            .ok_or(ValidationError::MissingField("temperature range"))?;
        let (min_penalty_factor, max_penalty_factor) = self
            .penalty_factors
            .ok_or(ValidationError::MissingField("penalty factors"))?;

        let contract = Contract {
            id: self.id,
            grower: Ref::new(grower),
            importer: Ref::new(importer),
            shipper: Ref::new(shipper),
            arrival_deadline,
            unit_price,
            min_temperature,
            max_temperature,
            min_penalty_factor,
            max_penalty_factor,
        };
        contract.validate()?;
        Ok(contract)
    }
}

fn required(id: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        Some(_) => Err(ValidationError::EmptyId(field)),
        None => Err(ValidationError::MissingField(field)),
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentStatus {
    #[n(0)]
    Created,
    #[n(1)]
    InTransit,
    #[n(2)]
    Arrived,
}

/// Proof that a certificate or clearance transaction was executed.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct GrantEvent {
    #[n(0)]
    pub transaction_id: String,
    #[n(1)]
    pub timestamp: TimeStamp,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct TemperatureReading {
    #[n(0)]
    #[cbor(with = "crate::types::decimal")]
    pub centigrade: Decimal,
    #[n(1)]
    pub timestamp: TimeStamp,
    #[n(2)]
    pub production_lot: Ref<ProductionLot>,
}

impl TemperatureReading {
    pub fn new(
        centigrade: Decimal,
        timestamp: TimeStamp,
        production_lot: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let production_lot = production_lot.into();
        if production_lot.is_empty() {
            return Err(ValidationError::EmptyId("production lot"));
        }
        Ok(Self {
            centigrade,
            timestamp,
            production_lot: Ref::new(production_lot),
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ProductionLot {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub grower: Ref<party::Grower>,
    #[n(2)]
    pub product_type: String,
    #[n(3)]
    pub expiration_date: TimeStamp,
    // what is left after batches were carved out
    #[n(4)]
    pub quantity: u64,
    #[n(5)]
    pub initial_quantity: u64,
    #[n(6)]
    pub contract: Ref<Contract>,
    #[n(7)]
    pub shipment_status: ShipmentStatus,
    #[n(8)]
    pub importer: Option<Ref<party::Importer>>,
    #[n(9)]
    pub temperature_readings: Vec<TemperatureReading>,
    #[n(10)]
    pub certificate: Option<GrantEvent>,
    #[n(11)]
    pub clearance: Option<GrantEvent>,
}

impl ProductionLot {
    pub fn draft(id: impl Into<String>) -> ProductionLotDraft {
        ProductionLotDraft::new(id)
    }
}

impl Record for ProductionLot {
    fn key(&self) -> RecordKey {
        RecordKey::new(RecordKind::ProductionLot, self.id.clone())
    }
}

impl Resolve for ProductionLot {
    type Target = ProductionLot;

    fn kind() -> RecordKind {
        RecordKind::ProductionLot
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProductionLotDraft {
    id: String,
    grower: Option<String>,
    product_type: Option<String>,
    expiration_date: Option<TimeStamp>,
    quantity: u64,
    contract: Option<String>,
}

impl ProductionLotDraft {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
    pub fn grower(mut self, id: impl Into<String>) -> Self {
        self.grower = Some(id.into());
        self
    }
    pub fn product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }
    pub fn expiration_date(mut self, date: TimeStamp) -> Self {
        self.expiration_date = Some(date);
        self
    }
    pub fn quantity(mut self, quantity: u64) -> Self {
        self.quantity = quantity;
        self
    }
    pub fn contract(mut self, id: impl Into<String>) -> Self {
        self.contract = Some(id.into());
        self
    }

    pub fn build(self) -> Result<ProductionLot, ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId("production lot id"));
        }
        let grower = required(self.grower, "grower")?;
        let contract = required(self.contract, "contract")?;
        let product_type = required(self.product_type, "product type")?;
        let expiration_date = self
            .expiration_date
            .ok_or(ValidationError::MissingField("expiration date"))?;

        Ok(ProductionLot {
            id: self.id,
            grower: Ref::new(grower),
            product_type,
            expiration_date,
            quantity: self.quantity,
            initial_quantity: self.quantity,
            contract: Ref::new(contract),
            shipment_status: ShipmentStatus::Created,
            importer: None,
            temperature_readings: vec![],
            certificate: None,
            clearance: None,
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub quantity: u64,
    #[n(2)]
    pub sold_quantity: u64,
    #[n(3)]
    pub production_lot: Ref<ProductionLot>,
    #[n(4)]
    pub supermarket: Option<Ref<party::Supermarket>>,
}

impl Batch {
    pub fn new(
        id: impl Into<String>,
        production_lot: impl Into<String>,
        quantity: u64,
        sold_quantity: u64,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let production_lot = production_lot.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyId("batch id"));
        }
        if production_lot.is_empty() {
            return Err(ValidationError::EmptyId("production lot"));
        }
        if sold_quantity > quantity {
            return Err(ValidationError::SoldExceedsQuantity {
                sold: sold_quantity,
                quantity,
            });
        }
        Ok(Self {
            id,
            quantity,
            sold_quantity,
            production_lot: Ref::new(production_lot),
            supermarket: None,
        })
    }

    pub fn available(&self) -> u64 {
        self.quantity.saturating_sub(self.sold_quantity)
    }
}

impl Record for Batch {
    fn key(&self) -> RecordKey {
        RecordKey::new(RecordKind::Batch, self.id.clone())
    }
}

impl Resolve for Batch {
    type Target = Batch;

    fn kind() -> RecordKind {
        RecordKind::Batch
    }
}

/// Receipt of one consumer purchase. Never changes after creation.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Products {
    #[n(0)]
    pub product_id: String,
    #[n(1)]
    pub quantity: u64,
    #[n(2)]
    pub consumer: Ref<party::Consumer>,
    #[n(3)]
    pub batch: Ref<Batch>,
}

impl Products {
    pub fn new(
        product_id: impl Into<String>,
        quantity: u64,
        consumer: impl Into<String>,
        batch: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let product_id = product_id.into();
        if product_id.is_empty() {
            return Err(ValidationError::EmptyId("product id"));
        }
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity("purchase quantity"));
        }
        Ok(Self {
            product_id,
            quantity,
            consumer: Ref::new(required(Some(consumer.into()), "consumer")?),
            batch: Ref::new(required(Some(batch.into()), "batch")?),
        })
    }
}

impl Record for Products {
    fn key(&self) -> RecordKey {
        RecordKey::new(RecordKind::Products, self.product_id.clone())
    }
}

impl Resolve for Products {
    type Target = Products;

    fn kind() -> RecordKind {
        RecordKind::Products
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn complete_draft() -> ContractDraft {
        Contract::draft("CON_001")
            .grower("grower@email.com")
            .importer("importer@email.com")
            .shipper("shipper@email.com")
            .arrival_deadline(TimeStamp::new_with(2024, 6, 15, 0, 0, 0).unwrap())
            .unit_price(dec!(0.5))
            .temperature_range(dec!(2), dec!(10))
            .penalty_factors(dec!(0.2), dec!(0.1))
    }

    #[test]
    fn contract_draft_builds() {
        let contract = complete_draft().build().unwrap();
        assert_eq!(contract.grower.id(), "grower@email.com");
        assert_eq!(contract.unit_price, dec!(0.5));
    }

    #[test]
    fn contract_requires_positive_price() {
        let err = complete_draft().unit_price(dec!(0)).build().unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveUnitPrice(dec!(0)));
    }

    #[test]
    fn contract_rejects_inverted_range() {
        let err = complete_draft()
            .temperature_range(dec!(11), dec!(10))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvertedTemperatureRange { .. }
        ));
    }

    #[test]
    fn contract_accepts_single_point_range() {
        assert!(
            complete_draft()
                .temperature_range(dec!(4), dec!(4))
                .build()
                .is_ok()
        );
    }

    #[test]
    fn contract_rejects_negative_penalty() {
        let err = complete_draft()
            .penalty_factors(dec!(0.2), dec!(-0.1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::NegativeValue { .. }));
    }

    #[test]
    fn contract_missing_shipper() {
        let err = Contract::draft("CON_002")
            .grower("g")
            .importer("i")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("shipper"));
    }

    #[test]
    fn lot_starts_created_with_full_quantity() {
        let lot = ProductionLot::draft("LOT_001")
            .grower("grower@email.com")
            .contract("CON_001")
            .product_type("BANANAS")
            .expiration_date(TimeStamp::new())
            .quantity(1000)
            .build()
            .unwrap();

        assert_eq!(lot.shipment_status, ShipmentStatus::Created);
        assert_eq!(lot.initial_quantity, 1000);
        assert!(lot.temperature_readings.is_empty());
        assert!(lot.certificate.is_none());
    }

    #[test]
    fn batch_sold_cannot_exceed_quantity() {
        let err = Batch::new("B1", "LOT_001", 10, 11).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SoldExceedsQuantity {
                sold: 11,
                quantity: 10
            }
        );
    }

    #[test]
    fn products_require_quantity() {
        assert_eq!(
            Products::new("P1", 0, "consumer@email.com", "B1").unwrap_err(),
            ValidationError::ZeroQuantity("purchase quantity")
        );
    }

    #[test]
    fn lot_round_trips_through_cbor() {
        let mut lot = ProductionLot::draft("LOT_001")
            .grower("g")
            .contract("c")
            .product_type("BANANAS")
            .expiration_date(TimeStamp::new())
            .quantity(5)
            .build()
            .unwrap();
        lot.temperature_readings
            .push(TemperatureReading::new(dec!(-1.25), TimeStamp::new(), "LOT_001").unwrap());
        lot.importer = Some(Ref::new("importer@email.com"));

        let bytes = minicbor::to_vec(&lot).unwrap();
        let decoded: ProductionLot = minicbor::decode(&bytes).unwrap();
        assert_eq!(lot, decoded);
    }
}
