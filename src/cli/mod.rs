//! CLI module - maintenance commands for Rosterr
//!
//! Thin consumer of the core services: every command prints core results
//! and contains no independent logic.

mod commands;

use clap::{CommandFactory, Parser, Subcommand};

use crate::config::Config;

/// Rosterr - Member portal data-consistency and authentication core
#[derive(Parser)]
#[command(name = "rosterr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the consistency report over accounts, members, and lookups
    #[command(alias = "-c", alias = "--check")]
    Check,

    /// Remove orphaned lookup rows (branches, industries, companies, skills)
    Cleanup,

    /// Cascade-delete an account together with its member profile
    DeleteAccount {
        /// Username of the account to delete
        username: String,
        /// Acting admin username
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// Reset an account's password to a temporary one
    ResetPassword {
        /// Username of the target account
        username: String,
        /// Acting admin username
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// Create an admin account with a generated temporary password
    CreateAdmin {
        /// Username for the new admin
        username: String,
    },

    /// Show recent security events
    SecurityLog {
        /// Number of entries to show
        #[arg(default_value = "20")]
        limit: u64,
        /// Filter by target account username
        #[arg(long)]
        user: Option<String>,
        /// Acting admin username
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check) => commands::cmd_check(&config).await,
        Some(Commands::Cleanup) => commands::cmd_cleanup(&config).await,
        Some(Commands::DeleteAccount { username, admin }) => {
            commands::cmd_delete_account(&config, &username, &admin).await
        }
        Some(Commands::ResetPassword { username, admin }) => {
            commands::cmd_reset_password(&config, &username, &admin).await
        }
        Some(Commands::CreateAdmin { username }) => {
            commands::cmd_create_admin(&config, &username).await
        }
        Some(Commands::SecurityLog { limit, user, admin }) => {
            commands::cmd_security_log(&config, limit, user.as_deref(), &admin).await
        }
        Some(Commands::Init) => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
