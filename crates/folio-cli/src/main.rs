//! CLI entry point.

use clap::Parser;

use folio_cli::{Cli, Commands, handlers, logging};

fn main() -> anyhow::Result<()> {
    // Load environment variables before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => handlers::simulate::execute(&args),
        Commands::Scenarios => {
            handlers::scenarios::execute();
            Ok(())
        }
    }
}
