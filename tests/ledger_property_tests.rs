//! Property-based tests for quantity and balance invariants of the ledger
//!
//! Each case runs a random sequence of transitions against a fresh temporary
//! store and checks the invariants after every step, including steps that
//! were rejected.

use perishable_network::model::Role;
use perishable_network::transactions::*;
use perishable_network::types::TimeStamp;
use perishable_network::{LedgerError, LedgerStore, SupplyChainService};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn seed_id(role: Role) -> &'static str {
    match role {
        Role::Grower => "grower@email.com",
        Role::Importer => "importer@email.com",
        Role::Shipper => "shipper@email.com",
        Role::Supermarket => "supermarket@email.com",
        Role::QualityInspector => "qualityinspector@email.com",
        Role::Customs => "customs@email.com",
        Role::Consumer => "consumer@email.com",
    }
}

fn setup_time() -> TimeStamp {
    TimeStamp::new_with(2024, 6, 1, 8, 0, 0).unwrap()
}

fn seeded_service() -> SupplyChainService {
    let service = SupplyChainService::new(LedgerStore::temporary().unwrap());
    service
        .setup(Setup {
            timestamp: setup_time(),
        })
        .unwrap();
    service
}

fn total_balance(service: &SupplyChainService) -> Decimal {
    Role::ALL
        .into_iter()
        .map(|role| service.participant(role, seed_id(role)).unwrap().account_balance)
        .sum()
}

fn lot_accounted(service: &SupplyChainService) -> u64 {
    let lot = service.production_lot("LOT_001").unwrap();
    let carved: u64 = service
        .batches_of("LOT_001")
        .unwrap()
        .iter()
        .map(|batch| batch.quantity)
        .sum();
    lot.quantity + carved
}

// PROPERTY TEST STRATEGIES

/// Strategy to generate batch requests that will sometimes exhaust the
/// 1000 unit seed lot
fn batch_sizes_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..=400, 1..8)
}

/// Strategy to generate in-transit temperatures between -5 and 15 °C
fn readings_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(-50i64..=150, 0..6)
        .prop_map(|tenths| tenths.into_iter().map(|t| Decimal::new(t, 1)).collect())
}

/// Strategy to generate consumer purchase sizes, some larger than a batch
fn purchases_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..=80, 0..8)
}

// PROPERTY TESTS
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: Remaining lot quantity plus every carved batch always adds
    /// up to the lot's original quantity, and an oversized request is
    /// rejected without changing anything
    #[test]
    fn prop_batches_never_exceed_lot(sizes in batch_sizes_strategy()) {
        let service = seeded_service();
        let initial = service.production_lot("LOT_001").unwrap().initial_quantity;
        let mut remaining = initial;

        for (i, size) in sizes.into_iter().enumerate() {
            let result = service.create_batch(CreateBatch {
                batch_id: format!("BATCH_{i:03}"),
                production_lot: "LOT_001".into(),
                quantity: size,
                sold_quantity: 0,
                timestamp: setup_time(),
            });

            if size <= remaining {
                prop_assert!(result.is_ok());
                remaining -= size;
            } else {
                let rejected = matches!(result, Err(LedgerError::InvalidTransition { .. }));
                prop_assert!(rejected);
            }
            prop_assert_eq!(service.production_lot("LOT_001").unwrap().quantity, remaining);
            prop_assert_eq!(lot_accounted(&service), initial);
        }
    }

    /// Property: Money only moves between participants, so the sum of all
    /// balances never changes, and no batch is ever oversold
    #[test]
    fn prop_balances_are_conserved(
        readings in readings_strategy(),
        purchases in purchases_strategy(),
        batch_size in 20u64..=200,
    ) {
        let service = seeded_service();
        let opening = total_balance(&service);

        service.issue_shipment(IssueShipment {
            production_lot: "LOT_001".into(),
            timestamp: setup_time(),
        }).unwrap();
        for centigrade in readings {
            service.record_temperature(RecordTemperature {
                production_lot: "LOT_001".into(),
                centigrade,
                timestamp: setup_time(),
            }).unwrap();
        }
        service.receive_shipment(ReceiveShipment {
            production_lot: "LOT_001".into(),
            importer: seed_id(Role::Importer).into(),
            timestamp: setup_time(),
        }).unwrap();
        prop_assert_eq!(total_balance(&service), opening);

        service.create_batch(CreateBatch {
            batch_id: "BATCH_001".into(),
            production_lot: "LOT_001".into(),
            quantity: batch_size,
            sold_quantity: 0,
            timestamp: setup_time(),
        }).unwrap();
        service.purchase_batch(PurchaseBatch {
            batch: "BATCH_001".into(),
            supermarket: seed_id(Role::Supermarket).into(),
            timestamp: setup_time(),
        }).unwrap();
        prop_assert_eq!(total_balance(&service), opening);

        let mut sold = 0;
        for (i, quantity) in purchases.into_iter().enumerate() {
            let result = service.purchase_products(PurchaseProducts {
                product_id: format!("PRODUCT_{i:03}"),
                batch: "BATCH_001".into(),
                consumer: seed_id(Role::Consumer).into(),
                quantity,
                timestamp: setup_time(),
            });
            if sold + quantity <= batch_size {
                prop_assert!(result.is_ok());
                sold += quantity;
            } else {
                prop_assert!(result.is_err());
            }

            let batch = service.batch("BATCH_001").unwrap();
            prop_assert_eq!(batch.sold_quantity, sold);
            prop_assert!(batch.sold_quantity <= batch.quantity);
            prop_assert_eq!(total_balance(&service), opening);
        }
    }
}
