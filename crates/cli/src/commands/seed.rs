//! `stockguard seed` - load a synthetic catalog and run simulated traffic.

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use stockguard_infra::{Catalog, FulfillmentEngine, MovementProcessor, ReadStore, SharedStore};

use crate::{generator, simulation};

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// RNG seed; the same seed always produces the same catalog
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 50)]
    pub suppliers: usize,

    #[arg(long, default_value_t = 200)]
    pub products: usize,

    /// Inventory movements to simulate
    #[arg(long, default_value_t = 100)]
    pub movements: usize,

    /// Orders to simulate
    #[arg(long, default_value_t = 20)]
    pub orders: usize,
}

pub async fn run(store: &SharedStore, args: SeedArgs) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    info!(seed = args.seed, "seeding");

    let catalog = Catalog::new(store.clone());
    let suppliers = catalog
        .add_suppliers(generator::suppliers(&mut rng, args.suppliers))
        .await
        .context("inserting suppliers")?;
    println!("Inserted {} suppliers", suppliers.len());

    let supplier_ids: Vec<_> = suppliers.iter().map(|s| s.id).collect();
    let products = catalog
        .add_products(generator::products(&mut rng, &supplier_ids, args.products))
        .await
        .context("inserting products")?;
    println!("Inserted {} products", products.len());

    let processor = MovementProcessor::new(store.clone());
    let movements = simulation::simulate_movements(&processor, &products, &mut rng, args.movements)
        .await
        .context("simulating movements")?;
    println!("Movements: {movements}");

    let engine = FulfillmentEngine::new(store.clone());
    let orders = simulation::simulate_orders(
        &engine,
        store.as_ref(),
        &products,
        &mut rng,
        args.orders,
    )
    .await
    .context("simulating orders")?;
    println!("Orders: {orders}");

    let counts = store.entity_counts().await?;
    println!();
    println!("Seed complete");
    println!("  Suppliers: {}", counts.suppliers);
    println!("  Products: {}", counts.products);
    println!("  Inventory movements: {}", counts.inventory_movements);
    println!("  Orders: {}", counts.orders);
    println!("  Order lines: {}", counts.order_lines);
    println!("  Audit records: {}", counts.audit_records);
    Ok(())
}
