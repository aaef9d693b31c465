use clap::Parser;
use std::io;

use snb::cli::{Cli, Commands};
use snb::cli_utils::{error_summary, use_ansi};
use snb::commands;
use snb::error::BuildError;
use snb::logging;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    logging::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    let result = match cli.into_command() {
        Commands::Build(args) => commands::build::run(&args).await,
        Commands::Status(args) => commands::status::run(&args).await,
        Commands::Cache(args) => commands::cache::cache(&args).await,
    };

    if let Err(err) = result {
        let exit_code = err
            .downcast_ref::<BuildError>()
            .map(BuildError::exit_code)
            .unwrap_or(1);

        let mut stderr = io::stderr();
        let ansi = use_ansi(&stderr);
        let _ = error_summary(&mut stderr, &format!("{:#}", err), ansi);

        std::process::exit(exit_code);
    }
}
