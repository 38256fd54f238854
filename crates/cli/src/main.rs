//! Tradedesk CLI - database migrations and back-office chores.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! tradedesk-cli migrate
//!
//! # Manage stores
//! tradedesk-cli store list
//! tradedesk-cli store create "Osaka"
//! tradedesk-cli store rename "Osaka" "Osaka Main"
//!
//! # Move customers in and out as Shift_JIS CSV
//! tradedesk-cli customers import --store "Osaka" customers.csv
//! tradedesk-cli customers export --store "Osaka" customers.csv
//! ```
//!
//! All commands read `TRADEDESK_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tradedesk-cli")]
#[command(author, version, about = "Tradedesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage stores
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Import or export customers
    Customers {
        #[command(subcommand)]
        action: CustomersAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// List stores
    List,
    /// Create a store
    Create {
        /// Store name
        name: String,
    },
    /// Rename a store
    Rename {
        /// Current store name
        name: String,
        /// New store name
        new_name: String,
    },
}

#[derive(Subcommand)]
enum CustomersAction {
    /// Import a Shift_JIS customer CSV into a store
    Import {
        /// Store to import into
        #[arg(short, long)]
        store: String,

        /// CSV file to read
        file: PathBuf,
    },
    /// Export every customer of a store as Shift_JIS CSV
    Export {
        /// Store name
        #[arg(short, long)]
        store: String,

        /// CSV file to write
        file: PathBuf,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Store { action } => match action {
            StoreAction::List => commands::store::list().await?,
            StoreAction::Create { name } => {
                commands::store::create(&name).await?;
            }
            StoreAction::Rename { name, new_name } => {
                commands::store::rename(&name, &new_name).await?;
            }
        },
        Commands::Customers { action } => match action {
            CustomersAction::Import { store, file } => {
                commands::customers::import(&store, &file).await?;
            }
            CustomersAction::Export { store, file } => {
                commands::customers::export(&store, &file).await?;
            }
        },
    }
    Ok(())
}
