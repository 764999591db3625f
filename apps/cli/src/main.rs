//! docmigrate CLI: move a reStructuredText documentation tree to MDX.
//!
//! Converts every `.rst` source through an external converter, rewrites the
//! result for MDX, and keeps per-directory navigation manifests in sync.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
