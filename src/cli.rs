//! CLI definitions for aodvv2d.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[clap(
    name = "aodvv2d",
    version,
    about = "AODVv2 reactive routing node for IPv6 mesh networks",
    long_about = None
)]
pub struct Cli {
    /// Path to aodvv2.toml config file
    #[clap(long, short, default_value = "aodvv2.toml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the node: joins ff02::6d, starts the routing and carrier tasks
    Run,

    /// Print an example aodvv2.toml to stdout
    Init,

    /// Print the current Router Client Set and Local Route Set
    Status,
}
