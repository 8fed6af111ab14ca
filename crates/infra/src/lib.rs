//! Infrastructure layer: storage backends and the transactional services
//! built on them (Stock Ledger, movements, order fulfillment, sequencing),
//! plus startup, reporting and reset.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fulfillment;
pub mod ledger;
pub mod movements;
pub mod reporting;
pub mod reset;
pub mod sequence;
pub mod store;

pub use bootstrap::{connect, wait_for_store, RetryPolicy};
pub use catalog::Catalog;
pub use config::{Backend, ConfigError, StoreConfig};
pub use error::{OperationError, StoreError};
pub use fulfillment::FulfillmentEngine;
pub use ledger::StockLedger;
pub use movements::MovementProcessor;
pub use reporting::{collect_report, reconcile_store, CommerceReport, ReportLimits};
pub use reset::reset_all;
pub use sequence::SequenceAllocator;
pub use store::{
    CommerceStore, EntityCounts, InMemoryStore, OrderLineView, PostgresStore, ReadStore,
    SharedStore, StockSnapshot, Store, StoreTx,
};
