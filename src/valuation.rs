//! Portfolio valuation.
//!
//! Turns a multi-stock portfolio into one comparable performance number. All
//! functions here are pure; money and weights are plain `f64`.

use crate::error::{AppError, AppResult};
use crate::models::PortfolioStock;

/// Slack allowed over the budget for share rounding
pub const BUDGET_TOLERANCE: f64 = 1.01;

/// The valuation-relevant view of one portfolio stock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holding {
    pub shares: f64,
    pub baseline_price: Option<f64>,
    pub current_price: Option<f64>,
    pub percent_change: Option<f64>,
}

impl Holding {
    pub fn new(shares: f64, baseline_price: Option<f64>, current_price: Option<f64>) -> Self {
        Self {
            shares,
            baseline_price,
            current_price,
            percent_change: stock_percent_change(baseline_price, current_price),
        }
    }

    /// Dollar amount put in at the baseline (unknown baseline counts as 0)
    pub fn initial_investment(&self) -> f64 {
        self.shares * self.baseline_price.unwrap_or(0.0)
    }
}

impl From<&PortfolioStock> for Holding {
    fn from(stock: &PortfolioStock) -> Self {
        Self {
            shares: stock.shares,
            baseline_price: stock.baseline_price,
            current_price: stock.current_price,
            percent_change: stock.percent_change,
        }
    }
}

/// `(current - baseline) / baseline * 100`, or `None` when either price is
/// unknown or the baseline is zero.
pub fn stock_percent_change(baseline: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (baseline, current) {
        (Some(b), Some(c)) if b != 0.0 => Some((c - b) / b * 100.0),
        _ => None,
    }
}

/// Weight of each holding: its share of total initial investment.
///
/// `None` when nothing has a priced baseline (total investment is zero).
pub fn investment_weights(holdings: &[Holding]) -> Option<Vec<f64>> {
    let total: f64 = holdings.iter().map(Holding::initial_investment).sum();
    if total == 0.0 {
        return None;
    }
    Some(
        holdings
            .iter()
            .map(|h| h.initial_investment() / total)
            .collect(),
    )
}

/// Aggregate percent change of a portfolio, weighted by initial investment.
///
/// Falls back to the unweighted mean of the per-stock changes (unknown
/// counted as 0) when total investment is zero. Returns `None` for an empty
/// portfolio.
pub fn weighted_percent_change(holdings: &[Holding]) -> Option<f64> {
    if holdings.is_empty() {
        return None;
    }

    match investment_weights(holdings) {
        Some(weights) => Some(
            holdings
                .iter()
                .zip(weights)
                .map(|(h, w)| w * h.percent_change.unwrap_or(0.0))
                .sum(),
        ),
        None => {
            let sum: f64 = holdings.iter().map(|h| h.percent_change.unwrap_or(0.0)).sum();
            Some(sum / holdings.len() as f64)
        }
    }
}

/// Aggregate for stored stocks
pub fn portfolio_percent_change(stocks: &[PortfolioStock]) -> Option<f64> {
    let holdings: Vec<Holding> = stocks.iter().map(Holding::from).collect();
    weighted_percent_change(&holdings)
}

/// Shares for a pick that arrived without an explicit count.
///
/// With a budget each stock gets an equal dollar slice. Without one every
/// stock gets exactly one share, which weights by share count rather than by
/// dollars.
pub fn allocate_shares(budget: Option<f64>, stock_count: usize, baseline_price: f64) -> f64 {
    match budget {
        Some(budget) if stock_count > 0 && baseline_price > 0.0 => {
            (budget / stock_count as f64) / baseline_price
        }
        _ => 1.0,
    }
}

/// Reject a portfolio whose baseline cost exceeds `budget * 1.01`
pub fn check_budget(holdings: &[Holding], budget: Option<f64>) -> AppResult<()> {
    let Some(budget) = budget else {
        return Ok(());
    };

    let invested: f64 = holdings.iter().map(Holding::initial_investment).sum();
    let limit = budget * BUDGET_TOLERANCE;
    if invested > limit {
        return Err(AppError::BudgetExceeded(format!(
            "portfolio costs ${:.2}, budget is ${:.2}",
            invested, budget
        )));
    }
    Ok(())
}
