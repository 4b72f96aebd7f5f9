// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kefu - customer-service message relay.
//!
//! This is the binary entry point for the relay.

mod serve;
mod shutdown;

use std::path::PathBuf;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use kefu_config::KefuConfig;

/// Kefu - customer-service message relay.
#[derive(Parser, Debug)]
#[command(name = "kefu", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay server.
    Serve,
    /// Inspect Kefu configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate the configuration, then print the effective values.
    Check,
}

fn load(path: Option<&PathBuf>) -> KefuConfig {
    let loaded = match path {
        Some(path) => kefu_config::load_and_validate_path(path),
        None => kefu_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            kefu_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("kefu: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config {
            action: ConfigCommands::Check,
        }) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                eprintln!("kefu: configuration is valid");
            }
            Err(e) => {
                eprintln!("kefu: failed to render configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("kefu: use --help for available commands");
        }
    }
}
