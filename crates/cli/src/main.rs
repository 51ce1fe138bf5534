//! Roastline CLI - backend checks and catalog inspection.
//!
//! # Usage
//!
//! ```bash
//! # Verify configuration and backend connectivity
//! roastline-cli check
//!
//! # List a page of the catalog
//! roastline-cli catalog list --page 2
//!
//! # Show one product as JSON
//! roastline-cli catalog show p1
//! ```
//!
//! # Commands
//!
//! - `check` - Verify configuration and backend connectivity
//! - `catalog list` - List a page of the catalog
//! - `catalog show` - Show one product document

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "roastline-cli")]
#[command(author, version, about = "Roastline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify configuration and backend connectivity
    Check,
    /// Inspect the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List a page of the catalog
    List {
        /// Page to fetch
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Filter by product id
        #[arg(short, long)]
        id: Option<String>,
    },
    /// Show one product document as JSON
    Show {
        /// Public product id (e.g. p1)
        prod_id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Check => commands::check::run().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::List { page, id } => {
                commands::catalog::list(page, id.as_deref()).await?;
            }
            CatalogAction::Show { prod_id } => commands::catalog::show(&prod_id).await?,
        },
    }
    Ok(())
}
