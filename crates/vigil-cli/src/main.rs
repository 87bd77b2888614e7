//! Vigil CLI - stock advisor with human confirmation of orders.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vigil_config::{LoadOptions, ResolvedConfig};

mod commands;
mod config_bridge;
mod theme;

use commands::{chat, config, orders, serve};

/// Vigil - stock advisor whose orders wait for you
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file applied over every discovered layer
    #[arg(long, global = true, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Listen address (overrides gateway.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Start an interactive advisor session
    Chat {
        /// Act as this user for orders and portfolio lookups
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Inspect stored orders
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// List a user's orders
    List {
        /// User id
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration with secrets omitted
    Show {
        /// Also list which layer set each field
        #[arg(long)]
        sources: bool,
    },
}

fn load_config(explicit: Option<PathBuf>) -> Result<ResolvedConfig> {
    let options = LoadOptions {
        workspace_root: std::env::current_dir().ok(),
        explicit_file: explicit,
        ..LoadOptions::default()
    };
    vigil_config::loader::load_with(&options).context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = load_config(cli.config)?;
    let cfg = &resolved.config;

    if let Err(e) = vigil_telemetry::setup_logging(&config_bridge::to_log_config(cfg, cli.verbose))
    {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Serve { bind } => serve::run_serve(cfg, bind).await,
        Commands::Chat { user } => chat::run_chat(cfg, user).await,
        Commands::Orders {
            command: OrderCommands::List { user },
        } => orders::list_orders(cfg, &user).await,
        Commands::Config {
            command: ConfigCommands::Show { sources },
        } => config::show(&resolved, sources),
    }
}
