//! # Tessel Engine
//!
//! Headless driver for the Tessel hexagonal world engine.
//!
//! This binary ties together:
//! - Configuration: `tessel.toml` with logging, auto-save and world settings
//! - World: chunk streaming, editing and persistence
//! - Auto-save: session timer or background worker

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod autosave;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, DEFAULT_LOG_FILTER};

/// Command line interface.
#[derive(Debug, Parser)]
#[command(name = "tessel", version, about = "Persistent hexagonal tile worlds")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a headless session that walks, mines and builds
    Run {
        /// World name
        #[arg(long)]
        world: String,
        /// Seed for a new world
        #[arg(long, allow_negative_numbers = true)]
        seed: Option<i64>,
        /// Number of steps
        #[arg(long, default_value_t = 200)]
        steps: u32,
        /// Distance walked per step, in pixels
        #[arg(long, default_value_t = 60.0)]
        step_distance: f64,
    },
    /// Print the tile at a pixel position
    Inspect {
        /// World name
        #[arg(long)]
        world: String,
        /// Pixel X
        #[arg(allow_negative_numbers = true)]
        x: f64,
        /// Pixel Y
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Write the active configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List saved worlds
    List,
    /// Delete a saved world
    Delete {
        /// World name
        name: String,
    },
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `directive`.
fn init_tracing(directive: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)
            .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?,
    };

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .with(filter)
        .init();
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(EngineConfig::default_path);
    let read = EngineConfig::read(&config_path);
    let (directive, json) = match &read {
        Ok(Some(config)) => (config.log_filter.clone(), config.log_json),
        _ => (DEFAULT_LOG_FILTER.to_string(), false),
    };
    init_tracing(&directive, json)?;

    info!("Tessel starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    let config = EngineConfig::resolve(read, &config_path);

    match cli.command {
        Command::Run {
            world,
            seed,
            steps,
            step_distance,
        } => {
            let options = app::RunOptions {
                world,
                seed,
                steps,
                step_distance,
            };
            let summary = app::run(&config, &options)?;
            println!(
                "{} steps: {} mined, {} placed, {} chunks evicted, {} auto-saves, {} chunks saved at exit",
                summary.steps,
                summary.mined,
                summary.placed,
                summary.evicted,
                summary.autosaves,
                summary.final_saved
            );
            if !summary.final_failed.is_empty() {
                println!("unsaved chunks: {:?}", summary.final_failed);
            }
        },
        Command::Inspect { world, x, y } => {
            print!("{}", app::inspect(&config, &world, x, y)?);
        },
        Command::Init { force } => {
            if app::init_config(&config, &config_path, force)? {
                println!("wrote {}", config_path.display());
            } else {
                println!("{} already exists", config_path.display());
            }
        },
        Command::List => {
            for name in app::list(&config)? {
                println!("{name}");
            }
        },
        Command::Delete { name } => {
            if app::delete(&config, &name)? {
                println!("deleted {name}");
            } else {
                println!("no world named {name}");
            }
        },
    }

    info!("Tessel shutdown complete");
    Ok(())
}
