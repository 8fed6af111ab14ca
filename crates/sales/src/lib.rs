//! Sales orders domain module.
//!
//! Order requests, line pricing and total computation, implemented purely as
//! deterministic domain logic (no IO, no storage). Stock reservation and
//! persistence happen in the fulfillment engine in `stockguard-infra`.

pub mod order;

pub use order::{
    Order, OrderLine, OrderNumber, OrderReceipt, OrderRequest, OrderStatus, PricedLine,
    PricedOrder, RequestedLine,
};
