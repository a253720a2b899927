//! Perishable goods supply network
//!
//! Tracks contracts, production lots, batches and consumer purchases on an
//! embedded ledger, and settles payments between growers, importers,
//! supermarkets and consumers as goods change hands. Shipments are priced by
//! [`pricing::settle_shipment`], which docks the contract price for every
//! degree the cold chain drifted outside the agreed range.

pub mod config;
pub mod error;
pub mod model;
pub mod pricing;
pub mod service;
pub mod store;
pub mod transactions;
pub mod transfer;
pub mod types;
pub mod utils;

pub use config::NetworkConfig;
pub use error::{LedgerError, ValidationError};
pub use service::{Receipt, SupplyChainService};
pub use store::LedgerStore;
