use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::auth::{JwtTokens, RequestSigner};
use crate::clock::{Clock, ManualClock, SystemClock};
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "starter-kit")]
#[command(about = "Starter kit API server and request-signing helpers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print Timestamp and Hash headers for a request path")]
    Sign {
        #[arg(long, help = "Request path, e.g. /api/v1/users")]
        path: String,

        #[arg(long, help = "Unix timestamp to sign with (defaults to now)")]
        timestamp: Option<i64>,
    },

    #[command(about = "Mint a bearer token for a user id")]
    Token {
        #[arg(long)]
        user_id: i64,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::server::serve(config).await,
        Commands::Sign { path, timestamp } => {
            let (timestamp, hash) = sign(&config, &path, timestamp)?;
            println!("Timestamp: {}", timestamp);
            println!("Hash: {}", hash);
            Ok(())
        }
        Commands::Token { user_id } => {
            if user_id <= 0 {
                anyhow::bail!("user id must be a positive integer");
            }
            let tokens = JwtTokens::new(config.security.jwt_secret.clone(), config.security.jwt_expiry_hours);
            println!("{}", tokens.issue(user_id)?);
            Ok(())
        }
    }
}

fn sign(config: &AppConfig, path: &str, timestamp: Option<i64>) -> anyhow::Result<(String, String)> {
    if config.security.app_secret.is_empty() {
        anyhow::bail!("APP_SECRET must be set to sign requests");
    }

    let clock: Arc<dyn Clock> = match timestamp {
        Some(ts) => {
            let at = chrono::DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| anyhow::anyhow!("timestamp {} is out of range", ts))?;
            Arc::new(ManualClock::new(at))
        }
        None => Arc::new(SystemClock),
    };

    Ok(RequestSigner::new(&config.security, clock).headers_for(path))
}
