//! Command line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Composite inventory inspection tool
#[derive(Parser, Debug)]
#[command(name = "plugible", version, about, long_about = None)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a composite inventory and dump it as JSON
    List(InventoryArgs),

    /// Parse a composite inventory and print the group tree
    Graph(InventoryArgs),
}

/// Arguments shared by the inventory subcommands
#[derive(Parser, Debug, Clone)]
pub struct InventoryArgs {
    /// Path to the composite inventory file
    #[arg(short = 'i', long = "inventory", required = true)]
    pub inventory: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}
