use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use std::collections::HashMap;

use stockguard_audit::{reconcile, AuditRecord, StockUpdateCause};
use stockguard_core::{Money, MovementId, ProductId};
use stockguard_infra::{Catalog, FulfillmentEngine, InMemoryStore, MovementProcessor};
use stockguard_inventory::MovementKind;
use stockguard_parties::NewSupplier;
use stockguard_products::{NewProduct, Product};
use stockguard_sales::RequestedLine;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// A store with `count` products, each holding plenty of stock.
fn seeded_store(rt: &tokio::runtime::Runtime, count: usize) -> (InMemoryStore, Vec<Product>) {
    rt.block_on(async {
        let store = InMemoryStore::new();
        let catalog = Catalog::new(store.clone());
        let supplier = catalog
            .add_suppliers(vec![NewSupplier::new("Bench Supply", "")])
            .await
            .unwrap()
            .remove(0);
        let products = catalog
            .add_products(
                (0..count)
                    .map(|i| NewProduct {
                        sku: format!("SKU-{i:05}"),
                        name: format!("Bench product {i}"),
                        unit_price: Money::from_cents(1_99),
                        initial_stock: i64::MAX / 4,
                        supplier_id: supplier.id,
                    })
                    .collect(),
            )
            .await
            .unwrap();
        (store, products)
    })
}

fn bench_movement_latency(c: &mut Criterion) {
    let rt = runtime();
    let (store, products) = seeded_store(&rt, 1);
    let processor = MovementProcessor::new(store);
    let product_id = products[0].id;

    let mut group = c.benchmark_group("movement_latency");
    group.throughput(Throughput::Elements(1));
    for kind in [MovementKind::In, MovementKind::Out] {
        group.bench_with_input(BenchmarkId::new("apply_movement", kind), &kind, |b, &kind| {
            b.iter(|| {
                black_box(
                    rt.block_on(processor.apply_movement(product_id, kind, 1, "bench"))
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
}

fn bench_order_by_line_count(c: &mut Criterion) {
    let rt = runtime();
    let (store, products) = seeded_store(&rt, 50);
    let engine = FulfillmentEngine::new(store);

    let mut group = c.benchmark_group("order_by_line_count");
    for line_count in [1usize, 5, 20] {
        let lines: Vec<RequestedLine> = products
            .iter()
            .take(line_count)
            .map(|p| RequestedLine::new(p.id, 1))
            .collect();
        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(BenchmarkId::new("create_order", line_count), &lines, |b, lines| {
            b.iter(|| black_box(rt.block_on(engine.create_order("bench", lines)).unwrap()));
        });
    }
    group.finish();
}

fn bench_reconciliation(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconciliation");
    for record_count in [1_000usize, 10_000] {
        let products: Vec<ProductId> = (0..100).map(|_| ProductId::new()).collect();
        let mut stock: HashMap<ProductId, i64> =
            products.iter().map(|id| (*id, 1_000_000)).collect();
        let opening = stock.clone();
        let records: Vec<AuditRecord> = (0..record_count)
            .map(|i| {
                let id = products[i % products.len()];
                let old = stock[&id];
                let new = old - 1;
                stock.insert(id, new);
                AuditRecord::stock_update(
                    id,
                    old,
                    new,
                    StockUpdateCause::Movement {
                        movement_id: MovementId::new(),
                    },
                    Utc::now(),
                )
            })
            .collect();

        group.throughput(Throughput::Elements(record_count as u64));
        group.bench_with_input(
            BenchmarkId::new("replay", record_count),
            &records,
            |b, records| {
                b.iter(|| {
                    let report = reconcile(&opening, &stock, records);
                    assert!(report.is_consistent());
                    black_box(report)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_movement_latency,
    bench_order_by_line_count,
    bench_reconciliation
);
criterion_main!(benches);
