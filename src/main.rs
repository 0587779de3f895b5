//! Plugible - composite inventory inspection CLI.
//!
//! Parses a composite inventory file and renders the merged result, either as
//! JSON (`list`) or as an indented group tree (`graph`).

mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Commands, InventoryArgs};
use plugible::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbosity());

    match &cli.command {
        Commands::List(args) => list_inventory(args),
        Commands::Graph(args) => graph_inventory(args),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "plugible=warn",
        1 => "plugible=info",
        2 => "plugible=debug",
        _ => "plugible=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn load_inventory(args: &InventoryArgs) -> Result<Inventory> {
    let plugin = CompositeInventory::new();
    if !plugin.verify_file(&args.inventory) {
        anyhow::bail!(
            "'{}' is not a readable YAML inventory file",
            args.inventory.display()
        );
    }

    let mut inventory = Inventory::new();
    plugin
        .parse(&mut inventory, &args.inventory)
        .with_context(|| format!("failed to parse {}", args.inventory.display()))?;
    Ok(inventory)
}

fn list_inventory(args: &InventoryArgs) -> Result<()> {
    let inventory = load_inventory(args)?;
    println!("{}", serde_json::to_string_pretty(&inventory)?);
    Ok(())
}

fn graph_inventory(args: &InventoryArgs) -> Result<()> {
    let inventory = load_inventory(args)?;
    print_group(&inventory, "all", 0);
    Ok(())
}

/// Print a group and everything below it, one indent level per edge.
fn print_group(inventory: &Inventory, name: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}@{name}:");
    if let Some(group) = inventory.get_group(name) {
        for host in &group.hosts {
            println!("{indent}  {host}");
        }
        for child in &group.children {
            print_group(inventory, child, depth + 1);
        }
    }
}
