pub mod audit_repository;
pub mod competition_repository;
pub mod memory;
pub mod participant_repository;
pub mod price_history_repository;
pub mod stock_repository;

// Re-export all repositories for convenient access
pub use audit_repository::{AuditRepository, PgAuditRepository};
pub use competition_repository::{CompetitionRepository, PgCompetitionRepository};
pub use memory::InMemoryStore;
pub use participant_repository::{ParticipantRepository, PgParticipantRepository};
pub use price_history_repository::{PgPriceHistoryRepository, PriceHistoryRepository};
pub use stock_repository::{PgStockRepository, StockEdit, StockRepository};

use crate::error::RepositoryError;
use sqlx::PgPool;
use std::sync::Arc;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Every store the services talk to, behind trait objects
#[derive(Clone)]
pub struct Repositories {
    pub competitions: Arc<dyn CompetitionRepository>,
    pub participants: Arc<dyn ParticipantRepository>,
    pub stocks: Arc<dyn StockRepository>,
    pub price_history: Arc<dyn PriceHistoryRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    /// Postgres-backed repositories sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            competitions: Arc::new(PgCompetitionRepository::new(pool.clone())),
            participants: Arc::new(PgParticipantRepository::new(pool.clone())),
            stocks: Arc::new(PgStockRepository::new(pool.clone())),
            price_history: Arc::new(PgPriceHistoryRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool)),
        }
    }

    /// All repositories backed by one shared in-memory store
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            competitions: store.clone(),
            participants: store.clone(),
            stocks: store.clone(),
            price_history: store.clone(),
            audit: store,
        }
    }
}
