//! mcast-select CLI - add devices of an application to a LoRaWAN multicast group.
//!
//! Works against an inventory file holding applications, devices, multicast
//! groups and memberships, so selections can be scripted and reviewed with
//! `--dry-run` before the group changes.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};
use output::get_formatter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let json = cli.json;
    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("{}", get_formatter(json).format_error(&e.to_string()));
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let inventory = cli.inventory.as_deref();

    match cli.command {
        Commands::Sources(args) => commands::run_sources(args, inventory, cli.json).await,
        Commands::Devices(args) => {
            commands::run_devices(args, inventory, cli.concurrency, cli.json).await
        }
        Commands::Add(args) => commands::run_add(args, inventory, cli.concurrency, cli.json).await,
    }
}
