#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stockpick_backend::clock::ManualClock;
use stockpick_backend::config::RefreshConfig;
use stockpick_backend::models::*;
use stockpick_backend::price_source::PriceSource;
use stockpick_backend::repositories::*;
use stockpick_backend::services::{CompetitionWindow, ParticipantPortfolio};
use stockpick_backend::AppState;

/// Price source answering from fixed tables and counting every call
#[derive(Default)]
pub struct ScriptedPriceSource {
    current: Mutex<HashMap<String, f64>>,
    historical: Mutex<HashMap<(String, NaiveDate), f64>>,
    current_calls: AtomicUsize,
    historical_calls: AtomicUsize,
}

impl ScriptedPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current(&self, ticker: &str, price: f64) {
        self.current.lock().unwrap().insert(ticker.to_string(), price);
    }

    pub fn clear_current(&self, ticker: &str) {
        self.current.lock().unwrap().remove(ticker);
    }

    pub fn set_historical(&self, ticker: &str, date: NaiveDate, price: f64) {
        self.historical
            .lock()
            .unwrap()
            .insert((ticker.to_string(), date), price);
    }

    pub fn current_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub fn historical_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.current_calls() + self.historical_calls()
    }
}

#[async_trait::async_trait]
impl PriceSource for ScriptedPriceSource {
    async fn current_price(&self, ticker: &str) -> Option<f64> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().get(ticker).copied()
    }

    async fn historical_price(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        self.historical
            .lock()
            .unwrap()
            .get(&(ticker.to_string(), date))
            .copied()
    }
}

/// Services wired to an in-memory store, scripted prices and a manual clock
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub prices: Arc<ScriptedPriceSource>,
    pub clock: ManualClock,
}

impl TestApp {
    pub fn new(now: NaiveDateTime) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let prices = Arc::new(ScriptedPriceSource::new());
        let clock = ManualClock::new(now);

        let state = AppState::with_parts(
            Repositories::from_store(store.clone()),
            prices.clone(),
            Arc::new(clock.clone()),
            &RefreshConfig { ttl_secs: 300 },
        );

        Self {
            state,
            store,
            prices,
            clock,
        }
    }

    /// Fresh app whose clock reads 2025-09-01 12:00 UTC
    pub fn default_app() -> Self {
        Self::new(at(2025, 9, 1, 12))
    }

    pub async fn create_backfill(&self, start_date: NaiveDate, budget: Option<f64>) -> Competition {
        self.state
            .competitions
            .create_competition("Backfill Cup", CompetitionWindow::Backfill { start_date }, budget)
            .await
            .expect("Failed to create backfill competition")
    }

    pub async fn create_live(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        budget: Option<f64>,
    ) -> Competition {
        self.state
            .competitions
            .create_competition("Live Cup", CompetitionWindow::Live { start, end }, budget)
            .await
            .expect("Failed to create live competition")
    }

    pub async fn join(&self, competition: &Competition, name: &str, tickers: &[&str]) -> ParticipantPortfolio {
        let picks: Vec<Pick> = tickers.iter().map(|t| Pick::single(*t)).collect();
        self.state
            .portfolios
            .join_competition(&competition.slug, name, &picks)
            .await
            .expect("Failed to join competition")
    }

    pub async fn participant_count(&self, competition: &Competition) -> i64 {
        self.state
            .repos
            .participants
            .count_by_competition(competition.id)
            .await
            .expect("Failed to count participants")
    }
}

/// Postgres-backed repositories for `#[sqlx::test]` cases
pub struct TestDatabase {
    pub pool: PgPool,
    pub repos: Repositories,
}

impl TestDatabase {
    /// Create TestDatabase from an existing pool (useful with sqlx::test)
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            repos: Repositories::postgres(pool.clone()),
            pool,
        }
    }

    /// Clean up all test data
    pub async fn cleanup(&self) {
        sqlx::query(
            "TRUNCATE TABLE audit_events, price_history, portfolio_stocks, participants, competitions CASCADE",
        )
        .execute(&self.pool)
        .await
        .expect("Failed to cleanup test data");
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    day(y, m, d).and_hms_opt(h, 0, 0).unwrap()
}

pub fn approx(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance
}
