//! Product catalog module.
//!
//! Products carry the current stock figure (the Stock Ledger's row), but this
//! crate only defines their shape and creation rules. Stock changes go through
//! `stockguard-inventory` arithmetic and the transactional services in infra.

pub mod product;

pub use product::{NewProduct, Product, Sku, MAX_SKU_LEN};
