//! `relay` - uploads a video to the translation server and follows the
//! job until the result is ready.

mod app;
mod cli;
mod config;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use relay_logging::relay_debug;

use cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    relay_logging::initialize(cli.log_destination(), cli.log_level());

    let config = config::load(cli.config.as_deref())?.with_server(cli.server.as_deref());
    relay_debug!("Effective config: {:?}", config);

    match cli.command {
        Commands::Submit(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(app::submit(args, config))
        }
        Commands::Config => {
            println!("{}", config.to_ron()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
