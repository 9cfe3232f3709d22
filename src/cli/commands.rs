//! CLI command definitions

use apolloview::auth::{TtlHours, DEFAULT_TTL_HOURS};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "apolloview")]
#[command(about = "Signed, expiring share links for ApolloView objects", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Token signing secret
    #[arg(long, env = "APOLLOVIEW_TOKEN_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the share-link HTTP service
    ///
    /// Reads APOLLOVIEW_BIND, APOLLOVIEW_PUBLIC_URL, APOLLOVIEW_API_KEYS and
    /// APOLLOVIEW_DEFAULT_TTL_HOURS from the environment.
    Serve {
        /// Address to bind to
        #[arg(short, long, env = "APOLLOVIEW_BIND")]
        bind: Option<String>,
    },

    /// Issue a share token for an object
    ///
    /// Examples:
    ///   apolloview issue 42
    ///   apolloview issue 42 --ttl-hours 0.5 --base-url https://view.example.com/object
    Issue {
        /// Object id the token grants access to
        #[arg(value_parser = parse_resource_id)]
        resource_id: u64,

        /// Token lifetime in hours (0.1 to 168)
        #[arg(long, default_value_t = DEFAULT_TTL_HOURS, value_parser = parse_ttl_hours)]
        ttl_hours: f64,

        /// Viewer URL to build a share link from
        #[arg(long, env = "APOLLOVIEW_PUBLIC_URL")]
        base_url: Option<String>,
    },

    /// Check a token or share link
    Verify {
        /// Token, share link, or query string containing `token=`
        token: String,
    },

    /// Generate a new signing secret
    Keygen,
}

fn parse_resource_id(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("resource id must be positive".to_string()),
        Ok(id) => Ok(id),
        Err(e) => Err(format!("invalid resource id {}: {}", s, e)),
    }
}

fn parse_ttl_hours(s: &str) -> Result<f64, String> {
    let hours: f64 = s
        .parse()
        .map_err(|e| format!("invalid ttl {}: {}", s, e))?;
    TtlHours::new(hours)
        .map(|ttl| ttl.hours())
        .map_err(|e| e.to_string())
}
