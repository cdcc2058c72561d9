use std::path::PathBuf;

use clap::Parser;
use sportsfest::{
    config::{FestivalConfig, create_app},
    state::{make_pool, run_migrations},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
pub struct Args {
    /// Falls back to `DATABASE_URL`, then to an in-memory database.
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
    /// TOML file with the festival configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    let db_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| ":memory:".to_string());

    tracing::info!(location = %db_url, "opening database");

    let config = FestivalConfig::load(args.config.as_deref())
        .expect("failed to load festival configuration");
    let pool = make_pool(&db_url).expect("failed to open database");
    run_migrations(&pool).expect("failed to run migrations");

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .expect("failed to bind");
    tracing::info!(bind = %args.bind, "listening");

    axum::serve(listener, create_app(pool, config))
        .await
        .expect("server error");
}
