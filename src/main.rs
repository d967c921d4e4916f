mod cli;
mod controller;
mod export;
mod logging;
mod model;
mod service;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init(&args)?;
    let is_headless = args.is_headless();

    match cli::run(args).await {
        Ok(()) => {
            // Exit explicitly in headless modes so lingering blocking tasks cannot hold the process
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "exiting with error");
            Err(e)
        }
    }
}
