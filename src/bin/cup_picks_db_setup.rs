use anyhow::Result;
use clap::Parser;
use sea_orm::EntityTrait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cup_picks::db::{self, entity::bets};

#[derive(Debug, Parser)]
#[command(name = "cup_picks_db_setup")]
#[command(about = "Create the picks tables", long_about = None)]
struct Args {
    /// Delete every stored bet after the schema is in place
    #[arg(long, default_value_t = false)]
    clear_bets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cup_picks=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    dotenv::dotenv().ok();
    let args = Args::parse();

    let conn = db::connect().await?;
    db::create_schema(&conn).await?;

    if args.clear_bets {
        let res = bets::Entity::delete_many().exec(&conn).await?;
        info!(
            target: "cup_picks::db",
            affected = res.rows_affected,
            "cleared bets table"
        );
    }

    Ok(())
}
