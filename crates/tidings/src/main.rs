// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tidings - a multi-tenant WhatsApp Business messaging pipeline.
//!
//! Binary entry point.

use clap::{Parser, Subcommand};

mod serve;

/// Tidings - a multi-tenant WhatsApp Business messaging pipeline.
#[derive(Parser, Debug)]
#[command(name = "tidings", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway and queue workers.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match tidings_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tidings_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("tidings serve failed: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("tidings: use --help for available commands");
        }
    }
}
