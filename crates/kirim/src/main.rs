// SPDX-FileCopyrightText: 2026 Kirim Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kirim - a multi-tenant WhatsApp gateway.
//!
//! This is the binary entry point for the gateway server.

mod serve;

use clap::{Parser, Subcommand};

/// Kirim - a multi-tenant WhatsApp gateway.
#[derive(Parser, Debug)]
#[command(name = "kirim", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kirim_config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kirim: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("kirim serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("kirim config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("kirim: use --help for available commands");
        }
    }
}
