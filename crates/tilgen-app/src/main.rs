use anyhow::Result;
use clap::Parser;

use tilgen::app::{run_web_server, setup_from_cli};
use tilgen::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();
    tilgen_logging::init_tracing(cli.verbose);

    let config = setup_from_cli(&cli)?;
    run_web_server(config).await
}
