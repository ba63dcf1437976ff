//! In-memory store implementing every repository trait.
//!
//! Mirrors the constraints the Postgres schema enforces (unique slug,
//! case-insensitive unique participant name per competition, unique ticker per
//! participant, cascading deletes) so services behave the same on either.

use super::{
    AuditRepository, CompetitionRepository, ParticipantRepository, PriceHistoryRepository,
    RepoResult, StockEdit, StockRepository,
};
use crate::error::RepositoryError;
use crate::models::{AuditEvent, Competition, Participant, PortfolioStock, PriceHistorySample};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    competitions: HashMap<Uuid, Competition>,
    participants: HashMap<Uuid, Participant>,
    stocks: HashMap<Uuid, PortfolioStock>,
    price_history: Vec<PriceHistorySample>,
    audit: Vec<AuditEvent>,
}

impl Tables {
    fn name_taken(&self, competition_id: Uuid, name: &str) -> bool {
        self.participants
            .values()
            .any(|p| p.competition_id == competition_id && p.has_name(name))
    }

    fn ticker_held(&self, participant_id: Uuid, ticker: &str) -> bool {
        self.stocks
            .values()
            .any(|s| s.participant_id == participant_id && s.ticker == ticker)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CompetitionRepository for InMemoryStore {
    async fn create(&self, competition: &Competition) -> RepoResult<Competition> {
        let mut tables = self.tables.lock().await;
        if tables
            .competitions
            .values()
            .any(|c| c.slug.eq_ignore_ascii_case(&competition.slug))
        {
            return Err(RepositoryError::Duplicate(format!(
                "competition slug {}",
                competition.slug
            )));
        }
        if competition.pick_window_end <= competition.pick_window_start {
            return Err(RepositoryError::ConstraintViolation(
                "pick window end must follow its start".to_string(),
            ));
        }
        tables
            .competitions
            .insert(competition.id, competition.clone());
        Ok(competition.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Competition>> {
        Ok(self.tables.lock().await.competitions.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Competition>> {
        Ok(self
            .tables
            .lock()
            .await
            .competitions
            .values()
            .find(|c| c.slug.eq_ignore_ascii_case(slug))
            .cloned())
    }

    async fn set_finalized(&self, id: Uuid, finalized: bool) -> RepoResult<Competition> {
        let mut tables = self.tables.lock().await;
        let competition = tables
            .competitions
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("competition {}", id)))?;
        competition.finalized = finalized;
        Ok(competition.clone())
    }

    async fn list(&self) -> RepoResult<Vec<Competition>> {
        let mut all: Vec<Competition> =
            self.tables.lock().await.competitions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for InMemoryStore {
    async fn create_with_stocks(
        &self,
        participant: &Participant,
        stocks: &[PortfolioStock],
    ) -> RepoResult<Participant> {
        let mut tables = self.tables.lock().await;
        if !tables.competitions.contains_key(&participant.competition_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "competition {} does not exist",
                participant.competition_id
            )));
        }
        if tables.name_taken(participant.competition_id, &participant.name) {
            return Err(RepositoryError::Duplicate(format!(
                "participant {}",
                participant.name
            )));
        }
        for (i, stock) in stocks.iter().enumerate() {
            if stocks[..i].iter().any(|s| s.ticker == stock.ticker) {
                return Err(RepositoryError::Duplicate(format!("ticker {}", stock.ticker)));
            }
        }

        tables.participants.insert(participant.id, participant.clone());
        for stock in stocks {
            tables.stocks.insert(stock.id, stock.clone());
        }
        Ok(participant.clone())
    }

    async fn find_by_competition(&self, competition_id: Uuid) -> RepoResult<Vec<Participant>> {
        let mut found: Vec<Participant> = self
            .tables
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.competition_id == competition_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(found)
    }

    async fn find_by_name(
        &self,
        competition_id: Uuid,
        name: &str,
    ) -> RepoResult<Option<Participant>> {
        Ok(self
            .tables
            .lock()
            .await
            .participants
            .values()
            .find(|p| p.competition_id == competition_id && p.has_name(name))
            .cloned())
    }

    async fn count_by_competition(&self, competition_id: Uuid) -> RepoResult<i64> {
        let count = self
            .tables
            .lock()
            .await
            .participants
            .values()
            .filter(|p| p.competition_id == competition_id)
            .count();
        Ok(count as i64)
    }

    async fn update_aggregate(
        &self,
        id: Uuid,
        percent_change: Option<f64>,
        primary_ticker: Option<&str>,
    ) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(participant) = tables.participants.get_mut(&id) {
            participant.percent_change = percent_change;
            participant.primary_ticker = primary_ticker.map(str::to_string);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.lock().await;
        let removed = tables.participants.remove(&id).is_some();
        tables.stocks.retain(|_, s| s.participant_id != id);
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl StockRepository for InMemoryStore {
    async fn find_by_participant(&self, participant_id: Uuid) -> RepoResult<Vec<PortfolioStock>> {
        self.find_by_participants(&[participant_id]).await
    }

    async fn find_by_participants(
        &self,
        participant_ids: &[Uuid],
    ) -> RepoResult<Vec<PortfolioStock>> {
        let mut found: Vec<PortfolioStock> = self
            .tables
            .lock()
            .await
            .stocks
            .values()
            .filter(|s| participant_ids.contains(&s.participant_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(found)
    }

    async fn apply_edit(&self, participant_id: Uuid, edit: &StockEdit) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;

        // Validate against a scratch copy so a failed edit changes nothing
        let mut stocks = tables.stocks.clone();
        stocks.retain(|_, s| !(s.participant_id == participant_id && edit.remove.contains(&s.ticker)));

        for (ticker, shares) in &edit.reweight {
            if *shares <= 0.0 {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "shares for {} must be positive",
                    ticker
                )));
            }
            if let Some(stock) = stocks
                .values_mut()
                .find(|s| s.participant_id == participant_id && &s.ticker == ticker)
            {
                stock.shares = *shares;
                stock.updated_at = edit.updated_at;
            }
        }

        for stock in &edit.add {
            if stocks
                .values()
                .any(|s| s.participant_id == participant_id && s.ticker == stock.ticker)
            {
                return Err(RepositoryError::Duplicate(format!("ticker {}", stock.ticker)));
            }
            stocks.insert(stock.id, stock.clone());
        }

        tables.stocks = stocks;
        Ok(())
    }

    async fn save_prices(&self, stock: &PortfolioStock) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(stored) = tables.stocks.get_mut(&stock.id) {
            stored.baseline_price = stock.baseline_price;
            stored.current_price = stock.current_price;
            stored.percent_change = stock.percent_change;
            stored.updated_at = stock.updated_at;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PriceHistoryRepository for InMemoryStore {
    async fn append(&self, sample: &PriceHistorySample) -> RepoResult<()> {
        self.tables.lock().await.price_history.push(sample.clone());
        Ok(())
    }

    async fn recent(&self, ticker: &str, limit: i64) -> RepoResult<Vec<PriceHistorySample>> {
        let tables = self.tables.lock().await;
        let mut samples: Vec<PriceHistorySample> = tables
            .price_history
            .iter()
            .filter(|s| s.ticker == ticker)
            .cloned()
            .collect();
        samples.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        samples.truncate(limit.max(0) as usize);
        Ok(samples)
    }
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryStore {
    async fn append(&self, event: &AuditEvent) -> RepoResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.competitions.contains_key(&event.competition_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "competition {} does not exist",
                event.competition_id
            )));
        }
        tables.audit.push(event.clone());
        Ok(())
    }

    async fn find_by_competition(&self, competition_id: Uuid) -> RepoResult<Vec<AuditEvent>> {
        Ok(self
            .tables
            .lock()
            .await
            .audit
            .iter()
            .filter(|e| e.competition_id == competition_id)
            .cloned()
            .collect())
    }
}
