// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Murmur - chat backend with tiered quotas and AI replies.
//!
//! This is the binary entry point.

mod serve;

use clap::{Parser, Subcommand};
use murmur_config::MurmurConfig;
use murmur_core::types::UserId;
use murmur_core::{MurmurError, StorageAdapter};
use murmur_storage::SqliteStorage;

/// Murmur - chat backend with tiered quotas and AI replies.
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API and background workers (default).
    Serve,
    /// Open the database, apply pending migrations and exit.
    Migrate,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Mint an access token for an existing user, for local testing.
    Token {
        #[arg(long)]
        user_id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, then print a summary.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match murmur_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            murmur_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Migrate => run_migrate(&config).await,
        Commands::Config {
            action: ConfigCommand::Check,
        } => {
            print_config_summary(&config);
            Ok(())
        }
        Commands::Token { user_id } => run_token(&config, UserId(user_id)).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_migrate(config: &MurmurConfig) -> Result<(), MurmurError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    storage.close().await?;
    println!("murmur: migrations applied to {}", config.storage.database_path);
    Ok(())
}

async fn run_token(config: &MurmurConfig, user_id: UserId) -> Result<(), MurmurError> {
    let issuer = murmur_auth::TokenIssuer::from_config(&config.auth)?;
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let user = storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| MurmurError::not_found("user", format!("no user with id {user_id}")))?;
    storage.close().await?;
    println!("{}", issuer.issue(&user)?);
    Ok(())
}

fn print_config_summary(config: &MurmurConfig) {
    println!("murmur: config OK");
    println!(
        "  server       {}:{}",
        config.server.bind_address, config.server.port
    );
    println!("  database     {}", config.storage.database_path);
    println!("  delivery     {}", config.pipeline.delivery_mode);
    println!(
        "  ai backend   {}",
        if config.gemini.api_key.is_some() {
            config.gemini.model.as_str()
        } else {
            "mock"
        }
    );
    println!(
        "  basic tier   {} messages/day, {} chatrooms",
        config.limits.basic_daily_messages, config.limits.basic_max_chatrooms
    );
    println!(
        "  auth         {}",
        if config.auth.jwt_secret.is_some() {
            "jwt secret set"
        } else {
            "jwt secret MISSING (serve will refuse to start)"
        }
    );
    println!(
        "  webhook      {}",
        if config.billing.webhook_secret.is_some() {
            "signing secret set"
        } else {
            "no signing secret (all deliveries rejected)"
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["murmur"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn token_requires_user_id() {
        assert!(Cli::try_parse_from(["murmur", "token"]).is_err());
        let cli = Cli::try_parse_from(["murmur", "token", "--user-id", "7"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Token { user_id: 7 })));
    }

    #[test]
    fn default_config_is_valid() {
        let config = murmur_config::load_and_validate_str("").unwrap();
        assert_eq!(config.agent.name, "murmur");
    }
}
