//! Suppliers.
//!
//! Suppliers are created once (bulk seeding) and then only referenced by
//! products; this crate holds their model and creation rules.

pub mod supplier;

pub use supplier::{NewSupplier, Supplier, MAX_SUPPLIER_NAME_LEN};
