use crate::clock::Clock;
use crate::error::{AppError, AppResult, RepositoryError};
use crate::lifecycle;
use crate::models::portfolio::{plan_edit, validate_display_name, validate_picks};
use crate::models::{
    Competition, CompetitionMode, CompetitionStatus, Participant, Pick, PortfolioChange,
    PortfolioStock,
};
use crate::price_source::PriceSource;
use crate::repositories::{Repositories, StockEdit};
use crate::services::audit::AuditTrailService;
use crate::services::competition_service::find_competition;
use crate::valuation::{self, Holding};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A participant together with their holdings
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantPortfolio {
    pub participant: Participant,
    pub stocks: Vec<PortfolioStock>,
}

/// Prices resolved for one ticker being added to a portfolio
#[derive(Debug, Clone, Copy, PartialEq)]
struct PricedPick {
    baseline: f64,
    current: f64,
}

/// Joining, editing and leaving competitions
pub struct PortfolioService {
    repos: Repositories,
    price_source: Arc<dyn PriceSource>,
    audit: Arc<AuditTrailService>,
    clock: Arc<dyn Clock>,
}

impl PortfolioService {
    pub fn new(
        repos: Repositories,
        price_source: Arc<dyn PriceSource>,
        audit: Arc<AuditTrailService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            price_source,
            audit,
            clock,
        }
    }

    /// Join a competition with an initial portfolio.
    ///
    /// Everything that can fail (validation, lock, name clash, ticker and
    /// price lookups, budget) is checked before the single atomic write.
    pub async fn join_competition(
        &self,
        key: &str,
        name: &str,
        picks: &[Pick],
    ) -> AppResult<ParticipantPortfolio> {
        let competition = find_competition(&self.repos, key).await?;
        let name = validate_display_name(name)?;
        let picks = validate_picks(picks)?;

        let now = self.clock.now();
        lifecycle::ensure_unlocked(&competition, now)?;

        if self
            .repos
            .participants
            .find_by_name(competition.id, &name)
            .await?
            .is_some()
        {
            return Err(AppError::NameTaken(name));
        }

        info!(
            "Joining {}: name={}, tickers={}",
            competition.slug,
            name,
            picks.len()
        );

        let mut participant = Participant::new(competition.id, name, now);
        let stock_count = picks.len();
        let mut stocks = Vec::with_capacity(stock_count);
        for pick in &picks {
            let priced = self.price_for_join(&competition, &pick.ticker).await?;
            let shares = pick.shares.unwrap_or_else(|| {
                valuation::allocate_shares(competition.budget, stock_count, priced.baseline)
            });
            stocks.push(PortfolioStock::new(
                participant.id,
                pick.ticker.clone(),
                shares,
                Some(priced.baseline),
                Some(priced.current),
                now,
            ));
        }

        let holdings: Vec<Holding> = stocks.iter().map(Holding::from).collect();
        valuation::check_budget(&holdings, competition.budget)?;

        participant.percent_change = valuation::weighted_percent_change(&holdings);
        participant.primary_ticker = stocks.first().map(|s| s.ticker.clone());

        let participant = self
            .repos
            .participants
            .create_with_stocks(&participant, &stocks)
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => AppError::NameTaken(participant.name.clone()),
                other => other.into(),
            })?;

        self.audit.log_joined(&competition, &participant, &stocks).await;

        Ok(ParticipantPortfolio {
            participant,
            stocks,
        })
    }

    /// Add, remove or reweight holdings of an existing participant
    pub async fn edit_portfolio(
        &self,
        key: &str,
        name: &str,
        changes: &[PortfolioChange],
    ) -> AppResult<ParticipantPortfolio> {
        let competition = find_competition(&self.repos, key).await?;
        let now = self.clock.now();
        lifecycle::ensure_unlocked(&competition, now)?;

        let participant = self.find_participant(&competition, name).await?;
        let existing = self.repos.stocks.find_by_participant(participant.id).await?;
        let held: Vec<String> = existing.iter().map(|s| s.ticker.clone()).collect();

        let plan = plan_edit(&held, changes)?;
        debug!(
            "Edit for {} in {}: +{} -{} ~{}",
            participant.name,
            competition.slug,
            plan.add.len(),
            plan.remove.len(),
            plan.reweight.len()
        );

        let stock_count = plan.resulting_tickers.len();
        let mut added = Vec::with_capacity(plan.add.len());
        for pick in &plan.add {
            let priced = self.price_for_edit(&competition, &pick.ticker, now).await?;
            let shares = pick.shares.unwrap_or_else(|| {
                valuation::allocate_shares(competition.budget, stock_count, priced.baseline)
            });
            added.push(PortfolioStock::new(
                participant.id,
                pick.ticker.clone(),
                shares,
                Some(priced.baseline),
                Some(priced.current),
                now,
            ));
        }

        let resulting = resulting_stocks(&existing, &plan.remove, &plan.reweight, &added);
        let holdings: Vec<Holding> = resulting.iter().map(Holding::from).collect();
        valuation::check_budget(&holdings, competition.budget)?;

        let edit = StockEdit {
            remove: plan.remove.clone(),
            reweight: plan.reweight.clone(),
            add: added,
            updated_at: now,
        };
        self.repos.stocks.apply_edit(participant.id, &edit).await?;

        let stocks = self.repos.stocks.find_by_participant(participant.id).await?;
        let participant = self.store_aggregate(participant, &plan.resulting_tickers, &stocks).await?;

        self.audit
            .log_portfolio_edited(&competition, &participant, changes)
            .await;

        Ok(ParticipantPortfolio {
            participant,
            stocks,
        })
    }

    /// Withdraw from a competition that is still open
    pub async fn leave_competition(&self, key: &str, name: &str) -> AppResult<()> {
        let competition = find_competition(&self.repos, key).await?;
        lifecycle::ensure_unlocked(&competition, self.clock.now())?;

        let participant = self.find_participant(&competition, name).await?;
        if !self.repos.participants.delete(participant.id).await? {
            return Err(AppError::NotFound(format!(
                "{} is not in {}",
                participant.name, competition.name
            )));
        }

        info!("{} left {}", participant.name, competition.slug);
        self.audit.log_left(&competition, &participant).await;
        Ok(())
    }

    async fn find_participant(&self, competition: &Competition, name: &str) -> AppResult<Participant> {
        let name = validate_display_name(name)?;
        self.repos
            .participants
            .find_by_name(competition.id, &name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} is not in {}", name, competition.name)))
    }

    /// Recompute and persist the aggregate and primary ticker after an edit
    async fn store_aggregate(
        &self,
        mut participant: Participant,
        ordered_tickers: &[String],
        stocks: &[PortfolioStock],
    ) -> AppResult<Participant> {
        let primary = match &participant.primary_ticker {
            Some(t) if ordered_tickers.contains(t) => Some(t.clone()),
            _ => ordered_tickers.first().cloned(),
        };
        let aggregate = valuation::portfolio_percent_change(stocks);

        self.repos
            .participants
            .update_aggregate(participant.id, aggregate, primary.as_deref())
            .await?;

        participant.percent_change = aggregate;
        participant.primary_ticker = primary;
        Ok(participant)
    }

    /// Confirm the ticker, then pick the baseline a new joiner gets
    async fn price_for_join(&self, competition: &Competition, ticker: &str) -> AppResult<PricedPick> {
        let current = self.confirm_ticker(ticker).await?;
        let baseline = match competition.mode_enum() {
            CompetitionMode::Live => current,
            CompetitionMode::Backfill => self.backfill_baseline(competition, ticker).await?,
        };
        Ok(PricedPick { baseline, current })
    }

    /// Confirm the ticker, then pick the baseline for a stock added later.
    /// An open live competition measures from the window start close; before
    /// the window opens there is no such close yet.
    async fn price_for_edit(
        &self,
        competition: &Competition,
        ticker: &str,
        now: NaiveDateTime,
    ) -> AppResult<PricedPick> {
        let current = self.confirm_ticker(ticker).await?;
        let baseline = match competition.mode_enum() {
            CompetitionMode::Backfill => self.backfill_baseline(competition, ticker).await?,
            CompetitionMode::Live if lifecycle::status(competition, now) == CompetitionStatus::Open => {
                self.price_source
                    .historical_price(ticker, competition.start_date())
                    .await
                    .unwrap_or(current)
            }
            CompetitionMode::Live => current,
        };
        Ok(PricedPick { baseline, current })
    }

    async fn confirm_ticker(&self, ticker: &str) -> AppResult<f64> {
        self.price_source
            .current_price(ticker)
            .await
            .ok_or_else(|| AppError::InvalidTicker(ticker.to_string()))
    }

    async fn backfill_baseline(&self, competition: &Competition, ticker: &str) -> AppResult<f64> {
        let date = competition.start_date();
        self.price_source
            .historical_price(ticker, date)
            .await
            .ok_or_else(|| {
                AppError::PriceUnavailable(format!("no close for {} on or before {}", ticker, date))
            })
    }
}

/// The portfolio as it would look after an edit, for the budget check
fn resulting_stocks(
    existing: &[PortfolioStock],
    remove: &[String],
    reweight: &[(String, f64)],
    added: &[PortfolioStock],
) -> Vec<PortfolioStock> {
    let mut stocks: Vec<PortfolioStock> = existing
        .iter()
        .filter(|s| !remove.contains(&s.ticker))
        .cloned()
        .collect();
    for stock in stocks.iter_mut() {
        if let Some((_, shares)) = reweight.iter().find(|(t, _)| *t == stock.ticker) {
            stock.shares = *shares;
        }
    }
    stocks.extend(added.iter().cloned());
    stocks
}
