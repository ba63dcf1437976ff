use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::models::{Competition, Participant, PortfolioStock, PriceHistorySample};
use crate::price_source::PriceSource;
use crate::repositories::Repositories;
use crate::valuation;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What one refresh run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Prices were fresh enough; nothing was fetched
    pub skipped: bool,
    pub tickers_fetched: usize,
    pub tickers_failed: usize,
    pub stocks_updated: usize,
    pub participants_recomputed: usize,
}

impl RefreshReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Pulls current prices for every stock in a competition, at most once per TTL
pub struct PriceRefresher {
    repos: Repositories,
    price_source: Arc<dyn PriceSource>,
    clock: Arc<dyn Clock>,
    last_refresh: TtlCache<Uuid, NaiveDateTime>,
}

impl PriceRefresher {
    pub fn new(
        repos: Repositories,
        price_source: Arc<dyn PriceSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            repos,
            price_source,
            last_refresh: TtlCache::new(ttl, clock.clone()),
            clock,
        }
    }

    /// When `competition_id` was last refreshed, unless that record has
    /// since expired and been evicted
    pub async fn last_refresh(&self, competition_id: Uuid) -> Option<NaiveDateTime> {
        self.last_refresh.written_at(&competition_id).await
    }

    /// Refresh unless the previous run is younger than the TTL
    pub async fn refresh_if_stale(&self, competition: &Competition) -> RefreshReport {
        if self.last_refresh.is_fresh(&competition.id).await {
            debug!("Prices for {} are fresh, skipping refresh", competition.slug);
            return RefreshReport::skipped();
        }
        self.force_refresh(competition).await
    }

    /// Refresh regardless of staleness. Never fails as a whole; per-ticker
    /// and per-write failures are logged and leave the affected rows as they
    /// were.
    pub async fn force_refresh(&self, competition: &Competition) -> RefreshReport {
        let mut report = RefreshReport::default();

        let participants = match self.repos.participants.find_by_competition(competition.id).await {
            Ok(participants) => participants,
            Err(e) => {
                warn!("Refresh of {}: failed to load participants: {}", competition.slug, e);
                return report;
            }
        };
        let ids: Vec<Uuid> = participants.iter().map(|p| p.id).collect();
        let mut stocks = if ids.is_empty() {
            Vec::new()
        } else {
            match self.repos.stocks.find_by_participants(&ids).await {
                Ok(stocks) => stocks,
                Err(e) => {
                    warn!("Refresh of {}: failed to load stocks: {}", competition.slug, e);
                    return report;
                }
            }
        };

        let prices = self.fetch_prices(&stocks, &mut report).await;
        let now = self.clock.now();

        let mut touched = HashSet::new();
        for stock in stocks.iter_mut() {
            let Some(&price) = prices.get(&stock.ticker) else {
                continue;
            };
            let updated = reprice(stock, price, now);
            match self.repos.stocks.save_prices(&updated).await {
                Ok(()) => {
                    *stock = updated;
                    report.stocks_updated += 1;
                    touched.insert(stock.participant_id);
                }
                Err(e) => warn!("Failed to save price for {} ({}): {}", stock.ticker, stock.id, e),
            }
        }

        for participant in participants.iter().filter(|p| touched.contains(&p.id)) {
            if self.recompute(participant, &stocks).await {
                report.participants_recomputed += 1;
            }
        }

        self.last_refresh.insert(competition.id, now).await;
        info!(
            competition = %competition.slug,
            fetched = report.tickers_fetched,
            failed = report.tickers_failed,
            stocks = report.stocks_updated,
            participants = report.participants_recomputed,
            "Prices refreshed"
        );
        report
    }

    /// Current price of every distinct ticker, each fetched once
    async fn fetch_prices(
        &self,
        stocks: &[PortfolioStock],
        report: &mut RefreshReport,
    ) -> BTreeMap<String, f64> {
        let tickers: BTreeSet<&str> = stocks.iter().map(|s| s.ticker.as_str()).collect();
        let mut prices = BTreeMap::new();

        for ticker in tickers {
            match self.price_source.current_price(ticker).await {
                Some(price) => {
                    report.tickers_fetched += 1;
                    prices.insert(ticker.to_string(), price);

                    let sample = PriceHistorySample::new(ticker.to_string(), price, self.clock.now());
                    if let Err(e) = self.repos.price_history.append(&sample).await {
                        warn!("Failed to record price history for {}: {}", ticker, e);
                    }
                }
                None => {
                    report.tickers_failed += 1;
                    warn!("No current price for {}, leaving its stocks untouched", ticker);
                }
            }
        }
        prices
    }

    async fn recompute(&self, participant: &Participant, stocks: &[PortfolioStock]) -> bool {
        let own: Vec<PortfolioStock> = stocks
            .iter()
            .filter(|s| s.participant_id == participant.id)
            .cloned()
            .collect();
        let aggregate = valuation::portfolio_percent_change(&own);

        match self
            .repos
            .participants
            .update_aggregate(participant.id, aggregate, participant.primary_ticker.as_deref())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to update aggregate for {}: {}", participant.name, e);
                false
            }
        }
    }
}

/// Apply a freshly fetched price. A stock that never got a baseline adopts
/// this price as its baseline.
fn reprice(stock: &PortfolioStock, price: f64, now: NaiveDateTime) -> PortfolioStock {
    let mut updated = stock.clone();
    if updated.baseline_price.is_none() {
        updated.baseline_price = Some(price);
    }
    updated.current_price = Some(price);
    updated.percent_change = valuation::stock_percent_change(updated.baseline_price, Some(price));
    updated.updated_at = now;
    updated
}
