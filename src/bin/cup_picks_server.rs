use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cup_picks::config::PicksConfig;
use cup_picks::server::{run_server, ServerConfig};

const DEFAULT_BIND: &str = "127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "cup_picks_server")]
#[command(about = "Serve the World Cup picks API", long_about = None)]
struct Args {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SERVER_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// SeaORM-compatible Postgres URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// E-mail addresses granted admin access (comma separated)
    #[arg(
        long = "admin-email",
        env = "PICKS_ADMIN_EMAILS",
        value_delimiter = ',',
        required = true,
        num_args = 1..
    )]
    admin_emails: Vec<String>,

    /// Allow more primary winners on a line than its choice limit
    #[arg(long, env = "PICKS_ALLOW_MULTIPLE_PRIMARY_WINNERS", default_value_t = false)]
    allow_multiple_primary_winners: bool,

    /// Create missing tables on startup
    #[arg(long, env = "PICKS_CREATE_SCHEMA", default_value_t = false)]
    create_schema: bool,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "SERVER_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;
    run_server(build_config(args)).await
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

fn build_config(args: Args) -> ServerConfig {
    let picks = PicksConfig::new(args.admin_emails)
        .with_multiple_primary_winners(args.allow_multiple_primary_winners);
    ServerConfig {
        bind: args.bind,
        database_url: args.database_url,
        max_connections: args.max_connections,
        create_schema: args.create_schema,
        picks,
    }
}
