//! ServiceHub CLI - backend diagnostics and collection seeding.
//!
//! # Usage
//!
//! ```bash
//! # Check the backend is reachable and accepts the project id
//! sh-cli probe
//!
//! # Write the product catalog into the items collection
//! sh-cli seed products
//!
//! # Create the users-collection document for an existing account
//! sh-cli seed user --id 64f1c2 --email jo@example.com --name "Jo Tester"
//! ```
//!
//! Configuration comes from the same environment variables as the
//! storefront (`APPWRITE_*`); seeding needs `APPWRITE_API_KEY` and
//! `APPWRITE_DATABASE_ID`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sh-cli")]
#[command(author, version, about = "ServiceHub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check backend reachability and project configuration
    Probe,
    /// Seed backend collections
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Write every catalog product into the items collection
    Products,
    /// Create the users-collection document for an account
    User {
        /// Account id issued by the backend
        #[arg(short, long)]
        id: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name (defaults to the email's local part)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Probe => commands::probe::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products => commands::seed::products().await?,
            SeedTarget::User { id, email, name } => {
                commands::seed::user(&id, &email, name.as_deref()).await?;
            }
        },
    }
    Ok(())
}
