// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cliniq - offline-first clinic queue token service.
//!
//! This is the binary entry point for the queue service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Cliniq - offline-first clinic queue token service.
#[derive(Parser, Debug)]
#[command(name = "cliniq", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the queue token service (gateway + notification sweep).
    Serve,
    /// Validate configuration and print the effective settings.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cliniq_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            cliniq_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) | None => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("cliniq: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            println!("configuration OK");
            println!("  service.name                        = {}", config.service.name);
            println!("  service.log_level                   = {}", config.service.log_level);
            println!("  storage.database_path               = {}", config.storage.database_path);
            println!(
                "  queue.average_consultation_minutes  = {}",
                config.queue.average_consultation_minutes
            );
            println!("  queue.default_prefix                = {}", config.queue.default_prefix);
            println!(
                "  notify.webhook_url                  = {}",
                config.notify.webhook_url.as_deref().unwrap_or("(disabled)")
            );
            println!(
                "  gateway                             = {}:{} (auth: {})",
                config.gateway.host,
                config.gateway.port,
                if config.gateway.bearer_token.is_some() { "bearer" } else { "off" }
            );
        }
    }
}
