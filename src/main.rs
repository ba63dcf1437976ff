//! Stockpick Backend
//!
//! Boots the backend against Postgres and prints the leaderboard of every
//! competition slug given on the command line. With no arguments it lists
//! the known competitions.

use anyhow::Context;
use stockpick_backend::clock::Clock;
use stockpick_backend::database::{create_pool, run_migrations, Database};
use stockpick_backend::lifecycle;
use stockpick_backend::{AppConfig, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("stockpick_backend={},sqlx=warn", config.log_level).into()
    });
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Stockpick backend starting");
    info!("Environment: {}", config.environment);
    info!("Price source: {}", config.price_source.base_url);
    info!("Refresh TTL: {}s", config.refresh.ttl_secs);

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    Database::new(pool.clone())
        .ping()
        .await
        .context("Database did not answer")?;
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Database migration failed")?;

    let state = AppState::new(pool, &config)?;
    info!("Application state initialized");

    let slugs: Vec<String> = std::env::args().skip(1).collect();
    if slugs.is_empty() {
        let now = state.clock.now();
        for competition in state.competitions.list_competitions().await? {
            println!(
                "{}\t{}\t{}\t{}",
                competition.slug,
                competition.mode,
                lifecycle::status(&competition, now).as_str(),
                competition.name
            );
        }
        return Ok(());
    }

    let mut failed = false;
    for slug in &slugs {
        match state.competitions.get_leaderboard(slug).await {
            Ok(entries) => {
                let body = serde_json::json!({ "competition": slug, "leaderboard": entries });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(e) => {
                error!("{}: {} ({})", slug, e, e.kind());
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("One or more leaderboards could not be loaded");
    }
    Ok(())
}
