//! p2praft demo node.

mod args;
mod cli;
mod logging;
mod node;

use clap::Parser;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse().load()?;
    logging::init_logging(&cli.logs)?;

    node::run(cli).await
}
