//! pluginstore CLI
//!
//! Deployment and operations surface for the store: schema init with
//! plugin seeding, one-shot or periodic maintenance, and read-outs of the
//! monitoring views.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pluginstore::config::{StoreConfig, CONFIG_FILE_PATH};
use pluginstore::{maintenance, Database};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pluginstore", about = "Cache and telemetry store for AI plugin gateways")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema and seed plugin configuration rows
    Init,
    /// Run one maintenance pass (cleanup + retention purges)
    Maintain,
    /// Run maintenance periodically until interrupted
    Watch,
    /// Show per-plugin cache statistics
    Stats,
    /// Show aggregated request metrics for one plugin
    Metrics {
        plugin: String,
        /// Trailing window in hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Partially update a plugin's configuration row
    ConfigSet {
        plugin: String,
        /// New rate limit (requests per minute)
        #[arg(long)]
        rate_limit: Option<i64>,
        /// Enable or disable the plugin
        #[arg(long)]
        enabled: Option<bool>,
        /// Replacement JSON config blob
        #[arg(long)]
        config_json: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let store_config = StoreConfig::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let db = Database::open(std::path::Path::new(&store_config.database.path))?;
    db.initialize(&store_config)?;

    match cli.command {
        Command::Init => {
            // Schema init and seeding already ran above; persist the
            // effective config so deployments can edit it in place.
            if !cli.config.exists() {
                store_config.save_to_path(&cli.config)?;
                println!("Wrote default config to {}", cli.config.display());
            }
            println!("Store initialized at {}", store_config.database.path);
        }
        Command::Maintain => {
            let report = maintenance::run_maintenance(&db, &store_config)?;
            print_report(&report);
        }
        Command::Watch => {
            log::info!(
                "Running maintenance every {}s, Ctrl-C to stop",
                store_config.maintenance.interval_secs
            );
            let handle = maintenance::spawn_maintenance_task(db, store_config);
            tokio::signal::ctrl_c().await?;
            handle.abort();
        }
        Command::Stats => {
            let stats = db.cache_statistics()?;
            if stats.is_empty() {
                println!("Cache is empty");
            }
            for s in stats {
                println!(
                    "{:<16} {:>6} entries  {:>4} users  avg age {:>8}s  last access {}",
                    s.plugin_name,
                    s.entry_count,
                    s.unique_users,
                    s.avg_age_secs.map(|a| a.round() as i64).unwrap_or(0),
                    s.last_accessed
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Command::Metrics { plugin, hours } => {
            let metrics = db.plugin_performance_metrics(&plugin, hours)?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        Command::ConfigSet {
            plugin,
            rate_limit,
            enabled,
            config_json,
        } => {
            let config_value = config_json
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .context("--config-json is not valid JSON")?;

            let applied =
                db.update_plugin_config(&plugin, config_value.as_ref(), rate_limit, enabled)?;
            if applied {
                println!("Updated plugin '{}'", plugin);
            } else {
                println!("No plugin named '{}'", plugin);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_report(report: &maintenance::MaintenanceReport) {
    if report.threshold_tripped {
        for (plugin, deleted) in &report.cache_deleted {
            println!("{}: {} cache entries removed", plugin, deleted);
        }
    } else {
        println!("Cache cleanup skipped (below row threshold)");
    }
    println!(
        "Purged {} metrics rows, {} log rows",
        report.performance_purged, report.logs_purged
    );
}
