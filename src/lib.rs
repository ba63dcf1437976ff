//! Stock-picking competition backend.
//!
//! Friends join a competition with a small stock portfolio; the backend
//! values every portfolio against its baseline prices and ranks them.

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod price_source;
pub mod repositories;
pub mod services;
pub mod valuation;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use clock::{Clock, SystemClock};
use config::RefreshConfig;
use price_source::{PriceSource, YahooPriceSource};
use repositories::Repositories;
use services::{AuditTrailService, CompetitionService, PortfolioService, PriceRefresher};
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub repos: Repositories,
    pub price_source: Arc<dyn PriceSource>,
    pub clock: Arc<dyn Clock>,
    pub refresher: Arc<PriceRefresher>,
    pub audit: Arc<AuditTrailService>,
    pub competitions: CompetitionService,
    pub portfolios: PortfolioService,
}

impl AppState {
    /// Production wiring: Postgres repositories, Yahoo prices, wall clock
    pub fn new(pool: sqlx::PgPool, config: &AppConfig) -> AppResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let price_source = Arc::new(YahooPriceSource::new(
            config.price_source.clone(),
            clock.clone(),
        )?);

        Ok(Self::with_parts(
            Repositories::postgres(pool),
            price_source,
            clock,
            &config.refresh,
        ))
    }

    /// Wire services around injected stores, price source and clock
    pub fn with_parts(
        repos: Repositories,
        price_source: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
        refresh: &RefreshConfig,
    ) -> Self {
        let audit = Arc::new(AuditTrailService::new(repos.audit.clone(), clock.clone()));
        let refresher = Arc::new(PriceRefresher::new(
            repos.clone(),
            price_source.clone(),
            clock.clone(),
            refresh.ttl(),
        ));
        let competitions = CompetitionService::new(
            repos.clone(),
            refresher.clone(),
            audit.clone(),
            clock.clone(),
        );
        let portfolios = PortfolioService::new(
            repos.clone(),
            price_source.clone(),
            audit.clone(),
            clock.clone(),
        );

        Self {
            repos,
            price_source,
            clock,
            refresher,
            audit,
            competitions,
            portfolios,
        }
    }
}
