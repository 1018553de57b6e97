//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use mcast_select_core::config::{DEFAULT_LOOKUP_CONCURRENCY, DEFAULT_PAGE_SIZE};
use mcast_select_core::SubmitStrategy;

/// mcast-select - add devices to LoRaWAN multicast groups in bulk
#[derive(Parser, Debug)]
#[command(name = "mcast-select")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Inventory file (default: platform data directory)
    #[arg(long, global = true, env = "MCAST_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Membership lookups run at once
    #[arg(long, global = true, default_value_t = DEFAULT_LOOKUP_CONCURRENCY, env = "MCAST_LOOKUP_CONCURRENCY")]
    pub concurrency: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List applications that can provide devices for a group
    Sources(SourcesArgs),

    /// Show one page of an application's devices with membership status
    Devices(DevicesArgs),

    /// Select devices of an application and add them to a group
    Add(AddArgs),
}

// ==================== Sources ====================

#[derive(Args, Debug)]
pub struct SourcesArgs {
    /// Multicast group ID
    pub group: String,

    /// Filter applications by name
    #[arg(short, long)]
    pub search: Option<String>,
}

// ==================== Devices ====================

#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// Multicast group ID
    pub group: String,

    /// Source application ID
    #[arg(long)]
    pub source: i64,

    /// Filter devices by name or DevEUI
    #[arg(short, long)]
    pub search: Option<String>,

    /// Page number, starting at 0
    #[arg(long, default_value = "0")]
    pub page: usize,

    /// Devices per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

// ==================== Add ====================

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Multicast group ID
    pub group: String,

    /// Source application ID
    #[arg(long)]
    pub source: i64,

    /// Select every device of the application
    #[arg(long)]
    pub all: bool,

    /// DevEUIs to check (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// DevEUIs to uncheck (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Devices fetched per page while loading the application
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// How a select-all is sent to the group
    #[arg(long, value_enum, default_value = "forward")]
    pub strategy: StrategyArg,

    /// Print the request without changing the group
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StrategyArg {
    /// Let the server resolve "all except"
    Forward,
    /// Resolve the device list locally
    Materialize,
}

impl From<StrategyArg> for SubmitStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Forward => SubmitStrategy::ForwardComplement,
            StrategyArg::Materialize => SubmitStrategy::Materialize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_command() {
        let cli = Cli::try_parse_from([
            "mcast-select",
            "--json",
            "add",
            "group-1",
            "--source",
            "3",
            "--all",
            "--exclude",
            "0000000000000001,0000000000000002",
            "--strategy",
            "materialize",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.group, "group-1");
                assert_eq!(args.source, 3);
                assert!(args.all);
                assert_eq!(args.exclude.len(), 2);
                assert!(args.include.is_empty());
                assert_eq!(
                    SubmitStrategy::from(args.strategy),
                    SubmitStrategy::Materialize
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
