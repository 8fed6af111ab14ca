//! stockguard - seed, inspect and reset the commerce store

use anyhow::Result;
use clap::{Parser, Subcommand};

use stockguard_cli::commands::{demo, reset, seed};
use stockguard_infra::{connect, StoreConfig};

#[derive(Parser)]
#[command(
    name = "stockguard",
    version,
    about = "Transactional inventory and order consistency engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a synthetic catalog, then simulate movements and orders
    Seed(seed::SeedArgs),
    /// Print recent orders, audit activity and a reconciliation summary
    Demo(demo::DemoArgs),
    /// Delete all data and restart order numbering
    Reset(reset::ResetArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    stockguard_observability::init();

    let cli = Cli::parse();
    let config = StoreConfig::from_env()?;
    let store = connect(&config).await?;

    match cli.command {
        Commands::Seed(args) => seed::run(&store, args).await,
        Commands::Demo(args) => demo::run(&store, args).await,
        Commands::Reset(args) => reset::run(&store, &config, args).await,
    }
}
