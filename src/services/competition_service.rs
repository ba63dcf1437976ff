use crate::clock::Clock;
use crate::error::{option_to_result, AppError, AppResult, RepositoryError};
use crate::lifecycle;
use crate::models::portfolio::{validate_budget, validate_competition_name};
use crate::models::{Competition, CompetitionStatus, Participant, PortfolioStock};
use crate::repositories::Repositories;
use crate::services::audit::AuditTrailService;
use crate::services::portfolio_service::ParticipantPortfolio;
use crate::services::refresh::{PriceRefresher, RefreshReport};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Slug collisions are retried this many times before giving up
const SLUG_ATTEMPTS: usize = 5;

/// How a new competition's pick window is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionWindow {
    /// Picks open at `start` and lock after `end`
    Live {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Retroactive competition measured from the close on `start_date`
    Backfill { start_date: NaiveDate },
}

/// Everything a competition page shows
#[derive(Debug, Clone, Serialize)]
pub struct CompetitionDetail {
    pub competition: Competition,
    pub status: CompetitionStatus,
    pub is_locked: bool,
    pub can_join: bool,
    pub can_edit_portfolio: bool,
    pub is_finalized: bool,
    pub participants: Vec<ParticipantPortfolio>,
    pub refresh: RefreshReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    pub participant_id: Uuid,
    pub name: String,
    pub percent_change: Option<f64>,
    pub primary_ticker: Option<String>,
    pub stock_count: usize,
}

/// Resolve a competition by slug (case-insensitive) or by id
pub(crate) async fn find_competition(repos: &Repositories, key: &str) -> AppResult<Competition> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::Validation("Competition key is required".into()));
    }

    let by_id = match Uuid::parse_str(key) {
        Ok(id) => repos.competitions.find_by_id(id).await?,
        Err(_) => None,
    };
    let found = match by_id {
        Some(competition) => Some(competition),
        None => repos.competitions.find_by_slug(key).await?,
    };

    option_to_result(found, &format!("Competition {} not found", key))
}

/// Creating, reading and locking competitions
pub struct CompetitionService {
    repos: Repositories,
    refresher: Arc<PriceRefresher>,
    audit: Arc<AuditTrailService>,
    clock: Arc<dyn Clock>,
}

impl CompetitionService {
    pub fn new(
        repos: Repositories,
        refresher: Arc<PriceRefresher>,
        audit: Arc<AuditTrailService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            refresher,
            audit,
            clock,
        }
    }

    /// Create a competition. Backfill start dates must lie in the past; the
    /// backfill window closes at creation time.
    pub async fn create_competition(
        &self,
        name: &str,
        window: CompetitionWindow,
        budget: Option<f64>,
    ) -> AppResult<Competition> {
        let name = validate_competition_name(name)?;
        let budget = validate_budget(budget)?;
        let now = self.clock.now();

        match window {
            CompetitionWindow::Live { start, end } if end <= start => {
                return Err(AppError::Validation(
                    "Pick window end must be after its start".into(),
                ));
            }
            CompetitionWindow::Backfill { start_date } if start_date >= now.date() => {
                return Err(AppError::Validation(format!(
                    "Backfill start date {} must be in the past",
                    start_date
                )));
            }
            _ => {}
        }

        for attempt in 1..=SLUG_ATTEMPTS {
            let competition = match window {
                CompetitionWindow::Live { start, end } => {
                    Competition::new_live(name.clone(), start, end, budget, now)
                }
                CompetitionWindow::Backfill { start_date } => {
                    Competition::new_backfill(name.clone(), start_date, budget, now)
                }
            };

            match self.repos.competitions.create(&competition).await {
                Ok(created) => {
                    info!(
                        "Created {} competition {} ({})",
                        created.mode, created.slug, created.name
                    );
                    self.audit.log_competition_created(&created).await;
                    return Ok(created);
                }
                Err(RepositoryError::Duplicate(_)) => {
                    warn!("Slug collision on attempt {}, regenerating", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Message(
            "Could not allocate a unique competition slug".into(),
        ))
    }

    pub async fn resolve(&self, key: &str) -> AppResult<Competition> {
        find_competition(&self.repos, key).await
    }

    pub async fn list_competitions(&self) -> AppResult<Vec<Competition>> {
        Ok(self.repos.competitions.list().await?)
    }

    /// Competition with every portfolio, after refreshing stale prices
    pub async fn get_competition_detail(&self, key: &str) -> AppResult<CompetitionDetail> {
        let competition = self.resolve(key).await?;
        let refresh = self.refresher.refresh_if_stale(&competition).await;

        let participants = self
            .repos
            .participants
            .find_by_competition(competition.id)
            .await?;
        let stocks = self.load_stocks(&participants).await?;

        let portfolios = participants
            .into_iter()
            .map(|participant| {
                let own = stocks
                    .iter()
                    .filter(|s| s.participant_id == participant.id)
                    .cloned()
                    .collect();
                ParticipantPortfolio {
                    participant,
                    stocks: own,
                }
            })
            .collect();

        let now = self.clock.now();
        Ok(CompetitionDetail {
            status: lifecycle::status(&competition, now),
            is_locked: lifecycle::is_locked(&competition, now),
            can_join: lifecycle::can_join(&competition, now),
            can_edit_portfolio: lifecycle::can_edit_portfolio(&competition, now),
            is_finalized: competition.finalized,
            competition,
            participants: portfolios,
            refresh,
        })
    }

    /// Ranked standings, after refreshing stale prices
    pub async fn get_leaderboard(&self, key: &str) -> AppResult<Vec<LeaderboardEntry>> {
        let competition = self.resolve(key).await?;
        self.refresher.refresh_if_stale(&competition).await;

        let participants = self
            .repos
            .participants
            .find_by_competition(competition.id)
            .await?;
        let stocks = self.load_stocks(&participants).await?;

        let counted = participants
            .into_iter()
            .map(|p| {
                let count = stocks.iter().filter(|s| s.participant_id == p.id).count();
                (p, count)
            })
            .collect();
        Ok(rank_leaderboard(counted))
    }

    /// Lock a backfill competition
    pub async fn finalize(&self, key: &str, actor: &str) -> AppResult<Competition> {
        let competition = self.resolve(key).await?;
        let participants = self
            .repos
            .participants
            .count_by_competition(competition.id)
            .await?;
        lifecycle::check_finalize(&competition, participants as usize)?;

        let updated = self
            .repos
            .competitions
            .set_finalized(competition.id, true)
            .await?;
        info!("{} finalized {}", actor, updated.slug);
        self.audit.log_finalized(&updated, actor).await;
        Ok(updated)
    }

    /// Reopen a finalized backfill competition
    pub async fn unfinalize(&self, key: &str, actor: &str) -> AppResult<Competition> {
        let competition = self.resolve(key).await?;
        lifecycle::check_unfinalize(&competition)?;

        let updated = self
            .repos
            .competitions
            .set_finalized(competition.id, false)
            .await?;
        info!("{} reopened {}", actor, updated.slug);
        self.audit.log_unfinalized(&updated, actor).await;
        Ok(updated)
    }

    async fn load_stocks(&self, participants: &[Participant]) -> AppResult<Vec<PortfolioStock>> {
        if participants.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
        Ok(self.repos.stocks.find_by_participants(&ids).await?)
    }
}

/// Order by percent change descending with unknowns last, then by name
/// (case-insensitive), and number the result from 1
pub fn rank_leaderboard(participants: Vec<(Participant, usize)>) -> Vec<LeaderboardEntry> {
    let mut sorted = participants;
    sorted.sort_by(|(a, _), (b, _)| {
        let by_change = match (a.percent_change, b.percent_change) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_change.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (p, stock_count))| LeaderboardEntry {
            rank: i + 1,
            participant_id: p.id,
            name: p.name,
            percent_change: p.percent_change,
            primary_ticker: p.primary_ticker,
            stock_count,
        })
        .collect()
}
