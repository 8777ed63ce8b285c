//! Catalog Admin - Operator CLI for the Pool Catalogue
//!
//! Manages pools, flavors and queue mappings in a file-backed control store,
//! and runs lookups/registrations through the same router the service uses.
//! Results are printed to stdout as pretty JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Add two pools in group "fast"
//! catalog-admin pool create p1 --uri memory://one --weight 100 --group fast
//! catalog-admin pool create p2 --uri memory://two --weight 100 --group fast
//!
//! # Alias the group for a project and place a queue through it
//! catalog-admin flavor create gold --project tenant-a --pool-group fast
//! catalog-admin register orders --project tenant-a --flavor gold
//!
//! # Where does it live?
//! catalog-admin lookup orders --project tenant-a
//!
//! # Alternate store and verbose logging
//! catalog-admin --store /tmp/catalog.json --log-level debug pool list
//! ```

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_core::{
    default_store_path, load_config_from_path, CatalogRouter, ConfigOverrides, ControlStores,
    FileStore,
};
use clap::Parser;
use tracing::{debug, info};

use commands::Command;

/// Catalog Admin - manage pools, flavors and queue placement
#[derive(Parser, Debug)]
#[command(name = "catalog-admin")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "CATALOG_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Control store file (overrides the config file)
    #[arg(short = 's', long, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Auto-route unregistered queues on lookup
    #[arg(long)]
    virtual_pool: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CATALOG_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("catalog_admin={level},catalog_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.or_else(catalog_core::default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(store) = args.store {
        overrides = overrides.with_store_path(store);
    }
    if args.virtual_pool {
        overrides = overrides.with_virtual_pool(true);
    }
    overrides.apply(&mut config);
    debug!(source = %config.source(), "Configuration resolved");

    let store_path = config.store_path.clone().unwrap_or_else(default_store_path);
    let store = FileStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open control store {}", store_path.display()))?;
    info!(path = %store_path.display(), "Using control store");

    let router = CatalogRouter::builder(config)
        .stores(ControlStores::shared(Arc::new(store)))
        .build()
        .context("Invalid catalogue configuration")?;

    let output = commands::execute(args.command, &router).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
