//! `stockguard demo` - read-only report over the current data.

use anyhow::Result;
use clap::Args;

use stockguard_audit::Discrepancy;
use stockguard_infra::{collect_report, CommerceReport, ReportLimits, SharedStore};

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Emit the report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[arg(long, default_value_t = 5)]
    pub orders: usize,

    #[arg(long, default_value_t = 10)]
    pub stock_updates: usize,
}

pub async fn run(store: &SharedStore, args: DemoArgs) -> Result<()> {
    let limits = ReportLimits {
        recent_orders: args.orders,
        recent_stock_updates: args.stock_updates,
    };
    let report = collect_report(store.as_ref(), limits).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn heading(title: &str) {
    println!();
    println!("{}", "=".repeat(80));
    println!("{title}");
    println!("{}", "=".repeat(80));
}

fn print_report(report: &CommerceReport) {
    heading(&format!("LATEST {} ORDERS", report.recent_orders.len()));
    for order in &report.recent_orders {
        println!(
            "Order #{} | Customer: {} | Total: ${} | Status: {}",
            order.number,
            order.customer_name,
            order.total,
            order.status.as_str()
        );
    }

    heading("LINES OF FIRST ORDER");
    if let Some((order, lines)) = &report.first_order {
        println!("Order #{}:", order.number);
        for view in lines {
            println!(
                "  {} | {} | Qty: {} | Unit: ${} | Subtotal: ${}",
                view.sku,
                view.product_name,
                view.line.quantity,
                view.line.unit_price,
                view.line.subtotal
            );
        }
    }

    heading("RECENT STOCK CHANGES (audit)");
    for record in &report.recent_stock_updates {
        if let Some(update) = record.detail.as_stock_update() {
            println!(
                "  Product: {} | {} -> {} | {}",
                update.product_id, update.old_stock, update.new_stock, record.occurred_at
            );
        }
    }

    heading("AUDIT RECORDS BY TYPE");
    for (kind, count) in &report.audit_counts {
        println!("  {kind}: {count} records");
    }

    heading("TOTALS");
    let counts = &report.counts;
    println!("Suppliers: {}", counts.suppliers);
    println!("Products: {}", counts.products);
    println!("Orders: {}", counts.orders);
    println!("Order lines: {}", counts.order_lines);
    println!("Inventory movements: {}", counts.inventory_movements);
    println!("Audit records: {}", counts.audit_records);

    heading("AUDIT RECONCILIATION");
    let recon = &report.reconciliation;
    println!(
        "Checked {} stock updates across {} products",
        recon.records_checked, recon.products_checked
    );
    if recon.is_consistent() {
        println!("Audit trail matches current stock");
    } else {
        for discrepancy in &recon.discrepancies {
            println!("  {}", describe(discrepancy));
        }
    }
}

fn describe(discrepancy: &Discrepancy) -> String {
    match discrepancy {
        Discrepancy::BrokenChain {
            product_id,
            audit_id,
            expected_old,
            found_old,
        } => format!(
            "{product_id}: record {audit_id} starts at {found_old}, expected {expected_old}"
        ),
        Discrepancy::NegativeStock {
            product_id,
            audit_id,
            value,
        } => format!("{product_id}: record {audit_id} reports negative stock {value}"),
        Discrepancy::FinalMismatch {
            product_id,
            audited,
            actual,
        } => format!("{product_id}: audit trail ends at {audited}, ledger holds {actual}"),
        Discrepancy::UnknownProduct { product_id } => {
            format!("{product_id}: audited but not in the ledger")
        }
    }
}
