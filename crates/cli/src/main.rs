mod cli;
mod script;

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use metacat_catalog::{
    CatalogStore, CommandExecutor, CommandOutput, MemoryResolver, PlanCache, Session,
};
use metacat_core::config::{load_dotenv, Config};

use crate::cli::CliArgs;
use crate::script::parse_script;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let mut config = Config::from_env();
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(cluster) = &args.cluster {
        config.session.default_cluster = cluster.clone();
    }
    if let Some(database) = &args.database {
        config.session.default_database = database.clone();
    }
    if args.cascade_drops {
        config.catalog.cascade_drops = true;
    }
    config.log_summary();

    let text = read_script(&args.script)?;
    let commands = parse_script(&text)?;

    let store = if args.in_memory {
        CatalogStore::in_memory()
    } else {
        CatalogStore::open(&config.storage.data_dir).with_context(|| {
            format!(
                "failed to open catalog at {}",
                config.storage.data_dir.display()
            )
        })?
    };
    let store = Arc::new(store);
    bootstrap(&store, &config)?;

    let executor = CommandExecutor::new(
        store,
        Arc::new(MemoryResolver::new()),
        Arc::new(PlanCache::new(config.catalog.plan_cache_capacity)),
    )
    .with_cascade_drops(config.catalog.cascade_drops);
    let mut session = Session::from_config(&config.session);

    let mut failures = 0usize;
    for (i, command) in commands.into_iter().enumerate() {
        let kind = command.kind();
        match executor.execute(&mut session, command) {
            Ok(CommandOutput::Names(names)) => {
                for name in names {
                    println!("{}", name);
                }
            }
            Ok(CommandOutput::Done) => info!("#{} {} ok", i + 1, kind),
            Err(e) if args.keep_going => {
                error!("#{} {} failed: {}", i + 1, kind, e);
                failures += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("command #{} ({}) failed", i + 1, kind));
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} command(s) failed", failures);
    }
    Ok(())
}

fn read_script(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read commands from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read script: {}", path))
}

/// Make sure the session's starting cluster and database exist so
/// unqualified names work in a fresh catalog.
fn bootstrap(store: &CatalogStore, config: &Config) -> Result<()> {
    let cluster = &config.session.default_cluster;
    let database = &config.session.default_database;
    if !store.cluster_exists(cluster) {
        store
            .register_cluster(cluster)
            .with_context(|| format!("failed to create cluster {}", cluster))?;
    }
    if !store.database_exists(database, cluster) {
        store
            .register_database(database, cluster)
            .with_context(|| format!("failed to create database {}.{}", cluster, database))?;
    }
    Ok(())
}
