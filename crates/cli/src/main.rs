//! Bazaar CLI - database migrations and account/catalog management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! bz-cli migrate
//!
//! # Create an admin account (the only way to get one)
//! bz-cli user create -u alice -e alice@example.com -r admin
//!
//! # List accounts / change a role
//! bz-cli user list
//! bz-cli user set-role -u bob -r inventory_manager
//!
//! # Manage categories
//! bz-cli category add Books
//! bz-cli category list
//! ```
//!
//! The database is taken from `BAZAAR_DATABASE_URL`, then `DATABASE_URL`,
//! then `sqlite://bazaar.db`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_core::Role;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bz-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage item categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account with any role
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (prefer the environment variable over the flag)
        #[arg(short, long, env = "BAZAAR_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Role (`customer`, `inventory_manager`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: Role,
    },
    /// List all accounts
    List,
    /// Change the role of an existing account
    SetRole {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// New role
        #[arg(short, long)]
        role: Role,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Add a category
    Add {
        /// Category name
        name: String,
    },
    /// List categories
    List,
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => {
                commands::user::create(&pool, &username, &email, &password, role).await?;
            }
            UserAction::List => commands::user::list(&pool).await?,
            UserAction::SetRole { username, role } => {
                commands::user::set_role(&pool, &username, role).await?;
            }
        },
        Commands::Category { action } => match action {
            CategoryAction::Add { name } => commands::category::add(&pool, &name).await?,
            CategoryAction::List => commands::category::list(&pool).await?,
        },
    }
    Ok(())
}
