//! ApolloView CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{anyhow, Context, Result};
use apolloview::auth::{SigningKey, TokenCodec, TtlHours, TOKEN_SECRET_ENV};
use apolloview::config::ServiceConfig;
use apolloview::links::{extract_token, ShareLink};
use apolloview::server;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { bind } => serve(cli.secret, bind).await,
        Commands::Issue {
            resource_id,
            ttl_hours,
            base_url,
        } => issue(cli.secret, resource_id, ttl_hours, base_url),
        Commands::Verify { token } => verify(cli.secret, &token),
        Commands::Keygen => {
            println!("{}", SigningKey::generate().encoded());
            Ok(())
        }
    }
}

fn signing_key(secret: Option<String>) -> Result<SigningKey> {
    let secret = secret.with_context(|| format!("{} or --secret required", TOKEN_SECRET_ENV))?;
    SigningKey::new(secret).context("Invalid signing secret")
}

fn format_expiry(expires_at: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(expires_at)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| expires_at.to_string())
}

async fn serve(secret: Option<String>, bind: Option<String>) -> Result<()> {
    let mut config = match secret {
        Some(secret) => ServiceConfig::from_env_with_key(signing_key(Some(secret))?),
        None => ServiceConfig::from_env(),
    }
    .context("Invalid service configuration")?;

    if let Some(bind) = bind {
        config = config.bind_addr(bind.parse().context("Invalid bind address")?);
    }

    info!(
        bind = %config.bind_addr,
        public_url = %config.public_url,
        api_keys = config.api_keys.len(),
        default_ttl = %config.default_ttl,
        "Starting ApolloView share service..."
    );

    server::run(config).await
}

fn issue(
    secret: Option<String>,
    resource_id: u64,
    ttl_hours: f64,
    base_url: Option<String>,
) -> Result<()> {
    let codec = TokenCodec::new(signing_key(secret)?);
    let ttl = TtlHours::new(ttl_hours)?;
    let token = codec.issue(resource_id, ttl.to_duration())?;

    println!("{}", token);
    println!();
    println!("Object: {}", token.resource_id());
    println!("Expires: {}", format_expiry(token.expires_at()));
    if let Some(base_url) = base_url {
        println!("Link: {}", ShareLink::new(&base_url, &token));
    }

    Ok(())
}

fn verify(secret: Option<String>, input: &str) -> Result<()> {
    let codec = TokenCodec::new(signing_key(secret)?);
    let token = extract_token(input).ok_or_else(|| anyhow!("no token found in input"))?;

    let payload = codec.verify(&token)?;

    println!("Valid");
    println!("Object: {}", payload.resource_id);
    println!("Expires: {}", format_expiry(payload.expires_at));

    Ok(())
}
