//! Subcommands and their execution against a router

use anyhow::{Context, Result};
use catalog_core::{CatalogRouter, Flavor, NewPool, Options, PoolPatch, StorageProxy};
use clap::Subcommand;
use serde_json::{json, Value};

/// Top-level subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage pools
    #[command(subcommand)]
    Pool(PoolCommand),

    /// Manage flavors
    #[command(subcommand)]
    Flavor(FlavorCommand),

    /// Place a queue on a pool
    Register {
        /// Queue name
        queue: String,
        /// Owning project
        #[arg(short, long)]
        project: String,
        /// Flavor to place through
        #[arg(short, long)]
        flavor: Option<String>,
    },

    /// Show which pool owns a queue
    Lookup {
        /// Queue name
        queue: String,
        /// Owning project
        #[arg(short, long)]
        project: String,
    },

    /// Remove a queue's mapping
    Deregister {
        /// Queue name
        queue: String,
        /// Owning project
        #[arg(short, long)]
        project: String,
    },

    /// List a project's queue mappings
    Entries {
        /// Owning project
        #[arg(short, long)]
        project: String,
    },

    /// Show router counters for this invocation
    Stats,
}

/// `pool` subcommands
#[derive(Subcommand, Debug)]
pub enum PoolCommand {
    /// Register a pool
    Create {
        /// Pool id
        id: String,
        /// Backend uri, e.g. memory://local
        #[arg(long)]
        uri: String,
        /// Placement weight
        #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
        weight: i64,
        /// Capacity in queues, 0 for unlimited
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        max_capacity: i64,
        /// Pool group
        #[arg(long)]
        group: Option<String>,
        /// Driver option as key=value (value parsed as JSON when possible)
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
    },

    /// List pools
    List {
        /// Only pools in this group
        #[arg(long, conflicts_with_all = ["marker", "limit"])]
        group: Option<String>,
        /// Start after this pool id
        #[arg(long)]
        marker: Option<String>,
        /// Maximum number of pools
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one pool
    Show {
        /// Pool id
        id: String,
    },

    /// Change a pool
    Update {
        /// Pool id
        id: String,
        /// New backend uri
        #[arg(long)]
        uri: Option<String>,
        /// New weight
        #[arg(long, allow_negative_numbers = true)]
        weight: Option<i64>,
        /// New capacity
        #[arg(long, allow_negative_numbers = true)]
        max_capacity: Option<i64>,
        /// New group
        #[arg(long)]
        group: Option<String>,
        /// Remove the pool from its group
        #[arg(long, conflicts_with = "group")]
        clear_group: bool,
        /// Replace driver options with these key=value pairs
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        options: Vec<(String, Value)>,
    },

    /// Delete an unused pool
    Delete {
        /// Pool id
        id: String,
    },
}

/// `flavor` subcommands
#[derive(Subcommand, Debug)]
pub enum FlavorCommand {
    /// Create a flavor
    Create {
        /// Flavor name
        name: String,
        /// Owning project
        #[arg(short, long)]
        project: String,
        /// Pool group the flavor resolves to
        #[arg(long)]
        pool_group: String,
        /// Capability as key=value (value parsed as JSON when possible)
        #[arg(long = "capability", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        capabilities: Vec<(String, Value)>,
    },

    /// List a project's flavors
    List {
        /// Owning project
        #[arg(short, long)]
        project: String,
    },

    /// Show one flavor
    Show {
        /// Flavor name
        name: String,
        /// Owning project
        #[arg(short, long)]
        project: String,
    },

    /// Delete a flavor
    Delete {
        /// Flavor name
        name: String,
        /// Owning project
        #[arg(short, long)]
        project: String,
    },
}

/// Parse `key=value`; the value is JSON if it parses, otherwise a string
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn to_options(pairs: Vec<(String, Value)>) -> Options {
    pairs.into_iter().collect()
}

fn describe(proxy: &StorageProxy) -> Value {
    json!({
        "queue": proxy.queue(),
        "project": proxy.project(),
        "pool": proxy.pool_id(),
        "uri": proxy.pool().uri,
        "driver": proxy.driver().scheme(),
    })
}

/// Run one command and return what should be printed
pub async fn execute(command: Command, router: &CatalogRouter) -> Result<Value> {
    match command {
        Command::Pool(cmd) => execute_pool(cmd, router).await,
        Command::Flavor(cmd) => execute_flavor(cmd, router).await,
        Command::Register {
            queue,
            project,
            flavor,
        } => {
            let proxy = router
                .register(&queue, &project, flavor.as_deref())
                .await
                .with_context(|| format!("Failed to register {queue}"))?;
            Ok(describe(&proxy))
        }
        Command::Lookup { queue, project } => {
            let proxy = router.lookup(&queue, &project).await?;
            match proxy {
                Some(proxy) => {
                    let mut out = describe(&proxy);
                    out["alive"] = Value::Bool(proxy.is_alive().await);
                    Ok(out)
                }
                None => Ok(Value::Null),
            }
        }
        Command::Deregister { queue, project } => {
            router.deregister(&queue, &project).await?;
            Ok(json!({ "deregistered": queue, "project": project }))
        }
        Command::Entries { project } => Ok(serde_json::to_value(router.entries(&project).await?)?),
        Command::Stats => Ok(serde_json::to_value(router.metrics())?),
    }
}

async fn execute_pool(command: PoolCommand, router: &CatalogRouter) -> Result<Value> {
    match command {
        PoolCommand::Create {
            id,
            uri,
            weight,
            max_capacity,
            group,
            options,
        } => {
            let new = NewPool {
                id,
                weight,
                uri,
                max_capacity,
                group,
                options: to_options(options),
            };
            Ok(serde_json::to_value(router.create_pool(new).await?)?)
        }
        PoolCommand::List {
            group,
            marker,
            limit,
        } => {
            let pools = if marker.is_some() || limit.is_some() {
                router
                    .list_pools_page(marker.as_deref(), limit.unwrap_or(usize::MAX))
                    .await?
            } else {
                router.list_pools(group.as_deref()).await?
            };
            Ok(serde_json::to_value(pools)?)
        }
        PoolCommand::Show { id } => Ok(serde_json::to_value(router.get_pool(&id).await?)?),
        PoolCommand::Update {
            id,
            uri,
            weight,
            max_capacity,
            group,
            clear_group,
            options,
        } => {
            let patch = PoolPatch {
                uri,
                weight,
                max_capacity,
                group: if clear_group { Some(None) } else { group.map(Some) },
                options: (!options.is_empty()).then(|| to_options(options)),
            };
            Ok(serde_json::to_value(router.update_pool(&id, patch).await?)?)
        }
        PoolCommand::Delete { id } => {
            router.delete_pool(&id).await?;
            Ok(json!({ "deleted": id }))
        }
    }
}

async fn execute_flavor(command: FlavorCommand, router: &CatalogRouter) -> Result<Value> {
    match command {
        FlavorCommand::Create {
            name,
            project,
            pool_group,
            capabilities,
        } => {
            let flavor = Flavor {
                name,
                project,
                pool_group,
                capabilities: to_options(capabilities),
            };
            Ok(serde_json::to_value(router.create_flavor(flavor).await?)?)
        }
        FlavorCommand::List { project } => {
            Ok(serde_json::to_value(router.list_flavors(&project).await?)?)
        }
        FlavorCommand::Show { name, project } => {
            Ok(serde_json::to_value(router.get_flavor(&name, &project).await?)?)
        }
        FlavorCommand::Delete { name, project } => {
            router.delete_flavor(&name, &project).await?;
            Ok(json!({ "deleted": name, "project": project }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::{CatalogConfig, ControlStores, FileStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn file_router(dir: &TempDir) -> CatalogRouter {
        let store = FileStore::open(dir.path().join("catalog.json")).await.unwrap();
        CatalogRouter::builder(CatalogConfig::default())
            .stores(ControlStores::shared(Arc::new(store)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("max_messages=10").unwrap(),
            ("max_messages".to_string(), json!(10))
        );
        assert_eq!(
            parse_key_value("region=eu-west").unwrap(),
            ("region".to_string(), json!("eu-west"))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        crate::Args::command().debug_assert();
    }

    #[tokio::test]
    async fn test_commands_persist_across_invocations() {
        let dir = TempDir::new().unwrap();

        {
            let router = file_router(&dir).await;
            execute(
                Command::Pool(PoolCommand::Create {
                    id: "p1".to_string(),
                    uri: "memory://one".to_string(),
                    weight: 10,
                    max_capacity: 0,
                    group: Some("g".to_string()),
                    options: vec![],
                }),
                &router,
            )
            .await
            .unwrap();
            let placed = execute(
                Command::Register {
                    queue: "orders".to_string(),
                    project: "tenant".to_string(),
                    flavor: None,
                },
                &router,
            )
            .await
            .unwrap();
            assert_eq!(placed["pool"], "p1");
        }

        let router = file_router(&dir).await;
        let found = execute(
            Command::Lookup {
                queue: "orders".to_string(),
                project: "tenant".to_string(),
            },
            &router,
        )
        .await
        .unwrap();
        assert_eq!(found["pool"], "p1");
        assert_eq!(found["alive"], true);

        let err = execute(
            Command::Pool(PoolCommand::Delete {
                id: "p1".to_string(),
            }),
            &router,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("in use"));
    }
}
