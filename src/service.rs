//! Service layer API for supply chain lifecycle transitions
//!
//! Every transition follows the same shape: load the records it needs into a
//! [`WriteSet`], check preconditions, mutate the loaded copies, stage them
//! together with a journal entry, then commit. A failure anywhere before or
//! during the commit leaves the ledger exactly as it was.
use crate::config::NetworkConfig;
use crate::error::{LedgerError, Result, ValidationError};
use crate::model::{
    Address, Batch, Contract, GrantEvent, Participant, ProductionLot, Products, Role,
    ShipmentStatus, TemperatureReading, party,
};
use crate::pricing::{Settlement, settle_shipment};
use crate::store::{LedgerStore, RecordKind, Ref, Resolve, WriteSet};
use crate::transactions::*;
use crate::transfer::{Transfer, transfer_between};
use crate::types::TimeStamp;
use crate::utils;
use rust_decimal::Decimal;

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt<T> {
    pub transaction: TransactionRecord,
    pub outcome: T,
}

pub struct SupplyChainService {
    store: LedgerStore,
    config: NetworkConfig,
}

impl SupplyChainService {
    pub fn new(store: LedgerStore) -> Self {
        Self::with_config(store, NetworkConfig::default())
    }

    pub fn with_config(store: LedgerStore, config: NetworkConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Creates one participant of every role, the seed contract `CON_001`
    /// and the seed lot `LOT_001`.
    pub fn setup(&self, tx: Setup) -> Result<Receipt<()>> {
        let mut write_set = self.store.write_set();
        let balance = self.config.seed_balance;

        for (role, id, country) in [
            (Role::Grower, "grower@email.com", "USA"),
            (Role::Importer, "importer@email.com", "UK"),
            (Role::Shipper, "shipper@email.com", "Panama"),
            (Role::Supermarket, "supermarket@email.com", "Holland"),
            (Role::QualityInspector, "qualityinspector@email.com", "Holland"),
            (Role::Customs, "customs@email.com", "Holland"),
            (Role::Consumer, "consumer@email.com", "Holland"),
        ] {
            write_set.insert(&Participant::new(role, id, Address::new(country), balance)?)?;
        }

        let contract = Contract::draft("CON_001")
            .grower("grower@email.com")
            .importer("importer@email.com")
            .shipper("shipper@email.com")
            .arrival_deadline(tx.timestamp.checked_add(self.config.seed_delivery_window)?)
            .unit_price(Decimal::new(5, 1))
            .temperature_range(Decimal::from(2), Decimal::from(10))
            .penalty_factors(Decimal::new(2, 1), Decimal::new(1, 1))
            .build()?;
        write_set.insert(&contract)?;

        let lot = ProductionLot::draft("LOT_001")
            .grower("grower@email.com")
            .product_type("BANANAS")
            .expiration_date(tx.timestamp.checked_add(self.config.seed_shelf_life)?)
            .quantity(1000)
            .contract("CON_001")
            .build()?;
        write_set.insert(&lot)?;

        let transaction =
            self.commit_with_journal(write_set, TransactionKind::Setup, "setup", &tx, tx.timestamp)?;
        Ok(Receipt {
            transaction,
            outcome: (),
        })
    }

    pub fn create_contract(&self, tx: CreateContract) -> Result<Receipt<Contract>> {
        let mut write_set = self.store.write_set();

        write_set.load::<party::Grower>(&tx.grower)?;
        write_set.load::<party::Importer>(&tx.importer)?;
        write_set.load::<party::Shipper>(&tx.shipper)?;

        let contract = Contract::draft(tx.contract_id.clone())
            .grower(tx.grower.clone())
            .importer(tx.importer.clone())
            .shipper(tx.shipper.clone())
            .arrival_deadline(tx.arrival_deadline)
            .unit_price(tx.unit_price)
            .temperature_range(tx.min_temperature, tx.max_temperature)
            .penalty_factors(tx.min_penalty_factor, tx.max_penalty_factor)
            .build()?;
        write_set.insert(&contract)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::CreateContract,
            &contract.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: contract,
        })
    }

    pub fn create_production_lot(&self, tx: CreateProductionLot) -> Result<Receipt<ProductionLot>> {
        let mut write_set = self.store.write_set();

        write_set.load::<party::Grower>(&tx.grower)?;
        let contract = write_set.load::<Contract>(&tx.contract)?;

        if self.config.enforce_transition_guards && contract.grower.id() != tx.grower {
            return Err(LedgerError::invalid_transition(
                RecordKind::Contract,
                &contract.id,
                format!("grower `{}` is not party to this contract", tx.grower),
            ));
        }

        let lot = ProductionLot::draft(tx.production_lot_id.clone())
            .grower(tx.grower.clone())
            .product_type(tx.product_type.clone())
            .expiration_date(tx.expiration_date)
            .quantity(tx.quantity)
            .contract(tx.contract.clone())
            .build()?;
        write_set.insert(&lot)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::CreateProductionLot,
            &lot.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: lot,
        })
    }

    /// Carves a batch out of a production lot.
    pub fn create_batch(&self, tx: CreateBatch) -> Result<Receipt<Batch>> {
        let mut write_set = self.store.write_set();

        let mut lot = write_set.load::<ProductionLot>(&tx.production_lot)?;
        let batch = Batch::new(
            tx.batch_id.clone(),
            tx.production_lot.clone(),
            tx.quantity,
            tx.sold_quantity,
        )?;

        lot.quantity = lot.quantity.checked_sub(batch.quantity).ok_or_else(|| {
            LedgerError::invalid_transition(
                RecordKind::ProductionLot,
                &lot.id,
                format!(
                    "requested {} units but only {} remain",
                    batch.quantity, lot.quantity
                ),
            )
        })?;

        write_set.update(&lot)?;
        write_set.insert(&batch)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::CreateBatch,
            &batch.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: batch,
        })
    }

    /// Attaches a quality certificate to the lot. The attached event is the
    /// proof the inspection happened.
    pub fn grant_certificate(&self, tx: GrantCertificate) -> Result<Receipt<ProductionLot>> {
        self.grant(
            &tx.production_lot,
            tx.timestamp,
            TransactionKind::GrantCertificate,
            &tx,
            |lot| &mut lot.certificate,
        )
    }

    /// Attaches a customs clearance to the lot.
    pub fn grant_clearance(&self, tx: GrantClearance) -> Result<Receipt<ProductionLot>> {
        self.grant(
            &tx.production_lot,
            tx.timestamp,
            TransactionKind::GrantClearance,
            &tx,
            |lot| &mut lot.clearance,
        )
    }

    pub fn issue_shipment(&self, tx: IssueShipment) -> Result<Receipt<ProductionLot>> {
        let mut write_set = self.store.write_set();

        let mut lot = write_set.load::<ProductionLot>(&tx.production_lot)?;
        self.expect_status(&lot, ShipmentStatus::Created, "issue shipment")?;
        lot.shipment_status = ShipmentStatus::InTransit;
        write_set.update(&lot)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::IssueShipment,
            &lot.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: lot,
        })
    }

    pub fn record_temperature(&self, tx: RecordTemperature) -> Result<Receipt<ProductionLot>> {
        let mut write_set = self.store.write_set();

        let mut lot = write_set.load::<ProductionLot>(&tx.production_lot)?;
        self.expect_status(&lot, ShipmentStatus::InTransit, "record temperature")?;
        lot.temperature_readings.push(TemperatureReading::new(
            tx.centigrade,
            tx.timestamp,
            lot.id.clone(),
        )?);
        write_set.update(&lot)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::RecordTemperature,
            &lot.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: lot,
        })
    }

    /// Hands the lot to the importer and pays the grower the settled price.
    pub fn receive_shipment(&self, tx: ReceiveShipment) -> Result<Receipt<Settlement>> {
        let mut write_set = self.store.write_set();

        let mut lot = write_set.load::<ProductionLot>(&tx.production_lot)?;
        self.expect_status(&lot, ShipmentStatus::InTransit, "receive shipment")?;

        let importer = Ref::<party::Importer>::new(tx.importer.clone());
        write_set.resolve(&importer)?;
        let contract = write_set.resolve(&lot.contract)?;

        let settlement = settle_shipment(
            &contract,
            lot.quantity,
            &lot.temperature_readings,
            &tx.timestamp,
        )?;
        tracing::info!(
            lot = %lot.id,
            gross = %settlement.gross,
            penalty_per_unit = %settlement.penalty_per_unit,
            payout = %settlement.payout,
            late = settlement.late,
            "shipment settled"
        );

        lot.importer = Some(importer.clone());
        lot.shipment_status = ShipmentStatus::Arrived;
        write_set.update(&lot)?;
        transfer_between(&mut write_set, &importer, &lot.grower, settlement.payout)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::ReceiveShipment,
            &lot.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: settlement,
        })
    }

    /// A supermarket buys a batch from the importer at the contract price.
    pub fn purchase_batch(&self, tx: PurchaseBatch) -> Result<Receipt<Transfer>> {
        let mut write_set = self.store.write_set();

        let mut batch = write_set.load::<Batch>(&tx.batch)?;
        let supermarket = Ref::<party::Supermarket>::new(tx.supermarket.clone());
        if batch.supermarket.as_ref() == Some(&supermarket) {
            return Err(LedgerError::invalid_transition(
                RecordKind::Batch,
                &batch.id,
                format!("already owned by `{}`", tx.supermarket),
            ));
        }

        let lot = write_set.resolve(&batch.production_lot)?;
        let importer = lot.importer.clone().ok_or_else(|| {
            LedgerError::invalid_transition(
                RecordKind::ProductionLot,
                &lot.id,
                "shipment has not been received by an importer",
            )
        })?;
        let contract = write_set.resolve(&lot.contract)?;
        let total = contract
            .unit_price
            .checked_mul(Decimal::from(batch.quantity))
            .ok_or(ValidationError::AmountOverflow("batch price"))?;

        batch.supermarket = Some(supermarket.clone());
        write_set.update(&batch)?;
        let transfer = transfer_between(&mut write_set, &supermarket, &importer, total)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::PurchaseBatch,
            &batch.id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: transfer,
        })
    }

    /// A consumer buys units out of a supermarket-owned batch.
    pub fn purchase_products(&self, tx: PurchaseProducts) -> Result<Receipt<Products>> {
        let mut write_set = self.store.write_set();

        let products = Products::new(
            tx.product_id.clone(),
            tx.quantity,
            tx.consumer.clone(),
            tx.batch.clone(),
        )?;
        let mut batch = write_set.resolve(&products.batch)?;
        let supermarket = batch.supermarket.clone().ok_or_else(|| {
            LedgerError::invalid_transition(
                RecordKind::Batch,
                &batch.id,
                "batch has not been bought by a supermarket",
            )
        })?;
        if products.quantity > batch.available() {
            return Err(LedgerError::invalid_transition(
                RecordKind::Batch,
                &batch.id,
                format!(
                    "requested {} units but only {} are available",
                    products.quantity,
                    batch.available()
                ),
            ));
        }

        let lot = write_set.resolve(&batch.production_lot)?;
        let contract = write_set.resolve(&lot.contract)?;
        let total = contract
            .unit_price
            .checked_mul(Decimal::from(products.quantity))
            .ok_or(ValidationError::AmountOverflow("products price"))?;

        batch.sold_quantity += products.quantity;
        write_set.insert(&products)?;
        write_set.update(&batch)?;
        transfer_between(&mut write_set, &products.consumer, &supermarket, total)?;

        let transaction = self.commit_with_journal(
            write_set,
            TransactionKind::PurchaseProducts,
            &products.product_id,
            &tx,
            tx.timestamp,
        )?;
        Ok(Receipt {
            transaction,
            outcome: products,
        })
    }

    pub fn participant(&self, role: Role, id: &str) -> Result<Participant> {
        match role {
            Role::Grower => self.store.get::<party::Grower>(id),
            Role::Importer => self.store.get::<party::Importer>(id),
            Role::Shipper => self.store.get::<party::Shipper>(id),
            Role::Supermarket => self.store.get::<party::Supermarket>(id),
            Role::QualityInspector => self.store.get::<party::QualityInspector>(id),
            Role::Customs => self.store.get::<party::Customs>(id),
            Role::Consumer => self.store.get::<party::Consumer>(id),
        }
    }

    pub fn contract(&self, id: &str) -> Result<Contract> {
        self.store.get::<Contract>(id)
    }

    pub fn production_lot(&self, id: &str) -> Result<ProductionLot> {
        self.store.get::<ProductionLot>(id)
    }

    pub fn batch(&self, id: &str) -> Result<Batch> {
        self.store.get::<Batch>(id)
    }

    pub fn products(&self, id: &str) -> Result<Products> {
        self.store.get::<Products>(id)
    }

    /// Batches carved from the given lot.
    pub fn batches_of(&self, production_lot: &str) -> Result<Vec<Batch>> {
        Ok(self
            .store
            .all::<Batch>()?
            .into_iter()
            .filter(|batch| batch.production_lot.id() == production_lot)
            .collect())
    }

    pub fn transaction(&self, transaction_id: &str) -> Result<TransactionRecord> {
        self.store.get::<TransactionRecord>(transaction_id)
    }

    /// Every committed transaction, oldest first.
    pub fn history(&self) -> Result<Vec<TransactionRecord>> {
        let mut records = self.store.all::<TransactionRecord>()?;
        // timestamps are caller-supplied and may tie or disagree
        records.sort_by_key(|record| record.sequence);
        Ok(records)
    }

    fn grant<P: minicbor::Encode<()>>(
        &self,
        production_lot: &str,
        timestamp: TimeStamp,
        kind: TransactionKind,
        payload: &P,
        slot: impl Fn(&mut ProductionLot) -> &mut Option<GrantEvent>,
    ) -> Result<Receipt<ProductionLot>> {
        let mut write_set = self.store.write_set();

        let mut lot = write_set.load::<ProductionLot>(production_lot)?;
        if self.config.enforce_transition_guards && slot(&mut lot).is_some() {
            return Err(LedgerError::invalid_transition(
                RecordKind::ProductionLot,
                &lot.id,
                format!("{kind:?} was already executed"),
            ));
        }

        let transaction_id = new_transaction_id()?;
        *slot(&mut lot) = Some(GrantEvent {
            transaction_id: transaction_id.clone(),
            timestamp,
        });
        write_set.update(&lot)?;

        let transaction =
            self.commit_as(write_set, transaction_id, kind, &lot.id, payload, timestamp)?;
        Ok(Receipt {
            transaction,
            outcome: lot,
        })
    }

    fn expect_status(
        &self,
        lot: &ProductionLot,
        expected: ShipmentStatus,
        action: &str,
    ) -> Result<()> {
        if self.config.enforce_transition_guards && lot.shipment_status != expected {
            return Err(LedgerError::invalid_transition(
                ProductionLot::kind(),
                &lot.id,
                format!(
                    "cannot {action} while {:?}, expected {:?}",
                    lot.shipment_status, expected
                ),
            ));
        }
        Ok(())
    }

    fn commit_with_journal<P: minicbor::Encode<()>>(
        &self,
        write_set: WriteSet<'_>,
        kind: TransactionKind,
        subject: &str,
        payload: &P,
        timestamp: TimeStamp,
    ) -> Result<TransactionRecord> {
        let transaction_id = new_transaction_id()?;
        self.commit_as(write_set, transaction_id, kind, subject, payload, timestamp)
    }

    fn commit_as<P: minicbor::Encode<()>>(
        &self,
        mut write_set: WriteSet<'_>,
        transaction_id: String,
        kind: TransactionKind,
        subject: &str,
        payload: &P,
        timestamp: TimeStamp,
    ) -> Result<TransactionRecord> {
        let payload_digest =
            utils::cbor_digest(payload).map_err(|e| LedgerError::Codec(e.to_string()))?;
        let record = TransactionRecord {
            transaction_id,
            sequence: self.store.next_sequence()?,
            kind,
            subject: subject.to_owned(),
            timestamp,
            payload_digest,
        };
        write_set.insert(&record)?;
        write_set.commit()?;

        tracing::info!(
            transaction = %record.transaction_id,
            kind = ?record.kind,
            subject = %record.subject,
            "transaction committed"
        );
        Ok(record)
    }
}

fn new_transaction_id() -> Result<String> {
    utils::new_uuid_to_bech32("tx_").map_err(|e| LedgerError::Identifier(e.to_string()))
}
