//! # SieveDNS classifier
//!
//! Operator harness for the domain-classification engine: loads the
//! configuration, opens the store, and classifies the names given on the
//! command line the same way the embedding resolver's query path would.

use clap::Parser;
use sievedns_domain::Config;
use sievedns_infrastructure::{database, ClassificationEngine};
use tracing::info;

#[derive(Parser)]
#[command(name = "sievedns")]
#[command(version)]
#[command(about = "Classify domain names against a SieveDNS store")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the store, overriding the configured one
    #[arg(short, long)]
    store: Option<String>,

    /// Also resolve aliases for each name
    #[arg(long)]
    alias: bool,

    /// Domain names to classify
    #[arg(required = true)]
    names: Vec<String>,
}

fn init_logging(config: &Config) {
    let log_level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_max_level(log_level)
        .with_ansi(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }
    config.validate()?;

    init_logging(&config);
    info!(
        store = %config.store.path,
        handles = config.store.pool_size,
        "Configuration loaded"
    );

    let (pool, catalog) = database::open_store(&config.store).await?;
    let engine =
        ClassificationEngine::init(pool, catalog, config.routing.clone(), &config.cache).await?;

    for name in &cli.names {
        let decision = engine.classify(name).await;
        let v4 = engine.select_address(&decision, false);
        let v6 = engine.select_address(&decision, true);
        println!("{name}: {decision:?}");
        if let Some(target) = v4 {
            println!("  v4 target: {target:?}");
        }
        if let Some(target) = v6 {
            println!("  v6 target: {target:?}");
        }
        if cli.alias {
            match engine.alias(name).await {
                Some(target) => println!("  alias: {target}"),
                None => println!("  alias: (none)"),
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
