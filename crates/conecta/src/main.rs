// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conecta - commerce integration backend.
//!
//! Binary entry point: shipping, payments and WhatsApp confirmations for
//! every tenant behind one HTTP surface.

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use conecta_config::{ConectaConfig, ConfigError};

/// Conecta - commerce integration backend.
#[derive(Parser, Debug)]
#[command(name = "conecta", version, about, long_about = None)]
struct Cli {
    /// Configuration file; defaults to /etc/conecta/conecta.toml then ./conecta.toml.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API and every queue consumer.
    Serve,
    /// Validate configuration and exit.
    CheckConfig,
}

fn load(path: Option<&PathBuf>) -> Result<ConectaConfig, Vec<ConfigError>> {
    match path {
        Some(path) => conecta_config::load_and_validate_path(path),
        None => conecta_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            conecta_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("conecta: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!(
                "conecta: config ok (server={}:{}, broker={:?}, gateways={})",
                config.server.host,
                config.server.port,
                config.broker.kind,
                config.payments.gateways.join(",")
            );
        }
        None => {
            println!("conecta: use --help for available commands");
        }
    }
}
