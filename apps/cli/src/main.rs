//! LeadEnrich CLI: turn DACH job postings into callable leads.
//!
//! Reads a job posting payload, finds the hiring decision maker and a
//! phone number for them, and prints the enrichment result.

mod commands;
mod wiring;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // API keys usually live in a local .env during development
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
