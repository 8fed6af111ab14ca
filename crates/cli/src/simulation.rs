//! Drive the core with synthetic movements and orders.
//!
//! Success/failure counts are kept here, by the driver. Rejections are
//! expected and counted; fatal errors stop the run.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use stockguard_core::ProductId;
use stockguard_infra::{FulfillmentEngine, MovementProcessor, OperationError, ReadStore, Store};
use stockguard_inventory::MovementKind;
use stockguard_products::Product;
use stockguard_sales::RequestedLine;

use crate::generator;

/// Attempted/succeeded/failed counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    fn record<T>(&mut self, result: &Result<T, OperationError>) {
        self.attempted += 1;
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl core::fmt::Display for Tally {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "attempted: {}, succeeded: {}, failed: {}",
            self.attempted, self.succeeded, self.failed
        )
    }
}

/// `n` random movements, 60 % inbound with quantities 1–25.
///
/// An outbound movement the locally tracked stock cannot cover is turned
/// into an inbound one, so most of the batch should succeed.
pub async fn simulate_movements<S, R>(
    processor: &MovementProcessor<S>,
    products: &[Product],
    rng: &mut R,
    n: usize,
) -> Result<Tally, OperationError>
where
    S: Store,
    R: Rng + Send,
{
    let mut tally = Tally::default();
    let mut stock: HashMap<ProductId, i64> = products.iter().map(|p| (p.id, p.stock)).collect();

    for i in 0..n {
        let Some(product) = products.choose(rng) else {
            break;
        };
        let current = stock.get(&product.id).copied().unwrap_or(0);
        let mut kind = if rng.gen_bool(0.6) {
            MovementKind::In
        } else {
            MovementKind::Out
        };
        let quantity: i64 = rng.gen_range(1..=25);
        if kind == MovementKind::Out && current < quantity {
            kind = MovementKind::In;
        }

        let note = format!("Simulation {}", i + 1);
        let result = processor
            .apply_movement(product.id, kind, quantity, &note)
            .await;
        tally.record(&result);
        match result {
            Ok(movement) => {
                stock.insert(product.id, current + movement.delta());
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => warn!(error = %err, "simulated movement failed"),
        }
    }
    Ok(tally)
}

/// `n` random orders of 1–5 distinct products.
///
/// Quantities are 1..=min(5, stock) using the stock read just before the
/// order, and at least 1, so orders over empty products fail and are counted.
pub async fn simulate_orders<S, Q, R>(
    engine: &FulfillmentEngine<S>,
    reader: &Q,
    products: &[Product],
    rng: &mut R,
    n: usize,
) -> Result<Tally, OperationError>
where
    S: Store,
    Q: ReadStore + ?Sized,
    R: Rng + Send,
{
    let mut tally = Tally::default();

    for i in 0..n {
        let line_count = rng.gen_range(1..=5usize).min(products.len());
        let chosen: Vec<&Product> = products.choose_multiple(rng, line_count).collect();

        let mut lines = Vec::with_capacity(chosen.len());
        for product in chosen {
            let Some(current) = reader.product(product.id).await? else {
                continue;
            };
            let max_quantity = current.stock.clamp(1, 5);
            lines.push(RequestedLine::new(product.id, rng.gen_range(1..=max_quantity)));
        }
        if lines.is_empty() {
            continue;
        }

        let customer = generator::person_name(rng);
        let result = engine.create_order(&customer, &lines).await;
        tally.record(&result);
        match result {
            Ok(receipt) => println!(
                "Order created: #{} for {} with {} lines, total {}",
                receipt.order_number, customer, receipt.line_count, receipt.total
            ),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => println!("Order failed (#{}): {}", i + 1, err),
        }
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use stockguard_audit::reconcile;
    use stockguard_infra::{Catalog, InMemoryStore};

    async fn seeded(rng: &mut StdRng) -> (InMemoryStore, Vec<Product>) {
        let store = InMemoryStore::new();
        let catalog = Catalog::new(store.clone());
        let suppliers = catalog
            .add_suppliers(generator::suppliers(rng, 5))
            .await
            .unwrap();
        let ids: Vec<_> = suppliers.iter().map(|s| s.id).collect();
        let products = catalog
            .add_products(generator::products(rng, &ids, 30))
            .await
            .unwrap();
        (store, products)
    }

    #[tokio::test]
    async fn movements_never_fail_on_tracked_stock() {
        let mut rng = StdRng::seed_from_u64(42);
        let (store, products) = seeded(&mut rng).await;
        let processor = MovementProcessor::new(store.clone());

        let tally = simulate_movements(&processor, &products, &mut rng, 100)
            .await
            .unwrap();

        assert_eq!(tally.attempted, 100);
        assert_eq!(tally.succeeded, 100);
        let counts = store.entity_counts().await.unwrap();
        assert_eq!(counts.inventory_movements, 100);
        assert_eq!(counts.audit_records, 100);
    }

    #[tokio::test]
    async fn order_batch_leaves_a_consistent_store() {
        let mut rng = StdRng::seed_from_u64(42);
        let (store, products) = seeded(&mut rng).await;
        let opening = products.iter().map(|p| (p.id, p.stock)).collect();
        let engine = FulfillmentEngine::new(store.clone());

        let tally = simulate_orders(&engine, &store, &products, &mut rng, 20)
            .await
            .unwrap();

        assert_eq!(tally.attempted, 20);
        assert_eq!(tally.succeeded + tally.failed, 20);
        assert_eq!(store.entity_counts().await.unwrap().orders, tally.succeeded as u64);

        let report = reconcile(
            &opening,
            &store.stock_levels().await.unwrap(),
            &store.audit_trail().await.unwrap(),
        );
        assert!(report.is_consistent(), "{report:?}");
        assert!(store.stock_levels().await.unwrap().values().all(|s| *s >= 0));
    }

    #[test]
    fn tally_counts_outcomes() {
        let mut tally = Tally::default();
        tally.record::<()>(&Ok(()));
        tally.record::<()>(&Err(OperationError::Domain(
            stockguard_core::DomainError::validation("x"),
        )));
        assert_eq!(
            tally,
            Tally {
                attempted: 2,
                succeeded: 1,
                failed: 1
            }
        );
        assert_eq!(tally.to_string(), "attempted: 2, succeeded: 1, failed: 1");
    }
}
