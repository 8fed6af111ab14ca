//! `stockguard reset` - wipe all data and restart order numbering.

use anyhow::Result;
use clap::Args;

use stockguard_infra::{reset_all, SharedStore, StoreConfig};

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// First order number after the reset (defaults to ORDER_NUMBER_BASE)
    #[arg(long)]
    pub restart_at: Option<i64>,
}

pub async fn run(store: &SharedStore, config: &StoreConfig, args: ResetArgs) -> Result<()> {
    let restart_at = args.restart_at.unwrap_or(config.order_number_base);
    println!("Truncating tables...");
    reset_all(store.as_ref(), restart_at).await?;
    println!("Order numbering restarts at {restart_at}");
    println!("Reset complete");
    Ok(())
}
