//! Canonical portfolio input shapes and their validation.
//!
//! Whatever format a caller submits (a bare ticker, a list of tickers, a list
//! of ticker/share pairs) is normalised into `Vec<Pick>` before it reaches the
//! services. Nothing past this module branches on input format.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Smallest allowed portfolio
pub const MIN_PORTFOLIO_SIZE: usize = 1;
/// Largest allowed portfolio
pub const MAX_PORTFOLIO_SIZE: usize = 10;

const MAX_DISPLAY_NAME_LEN: usize = 50;
const MAX_COMPETITION_NAME_LEN: usize = 100;
const MAX_TICKER_LEN: usize = 10;

/// One requested holding. `shares: None` asks for automatic allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub ticker: String,
    #[serde(default)]
    pub shares: Option<f64>,
}

impl Pick {
    pub fn new(ticker: impl Into<String>, shares: Option<f64>) -> Self {
        Self {
            ticker: ticker.into(),
            shares,
        }
    }

    /// Legacy single-ticker entry
    pub fn single(ticker: impl Into<String>) -> Self {
        Self::new(ticker, None)
    }
}

/// One edit applied to an existing portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PortfolioChange {
    Add { ticker: String, shares: Option<f64> },
    Remove { ticker: String },
    Reweight { ticker: String, shares: f64 },
}

/// Validated outcome of applying a change list to a portfolio
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPlan {
    pub add: Vec<Pick>,
    pub remove: Vec<String>,
    pub reweight: Vec<(String, f64)>,
    /// Tickers of the portfolio after the edit, existing ones first
    pub resulting_tickers: Vec<String>,
}

/// Trim and validate a participant display name
pub fn validate_display_name(name: &str) -> AppResult<String> {
    validate_text("Name", name, MAX_DISPLAY_NAME_LEN)
}

/// Trim and validate a competition name
pub fn validate_competition_name(name: &str) -> AppResult<String> {
    validate_text("Competition name", name, MAX_COMPETITION_NAME_LEN)
}

fn validate_text(label: &str, value: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", label)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            label, max_len
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AppError::Validation(format!(
            "{} must not contain control characters",
            label
        )));
    }
    Ok(trimmed.to_string())
}

/// Uppercase and validate a ticker symbol (`BRK.B`, `RDS-A`, `NVDA`)
pub fn normalize_ticker(ticker: &str) -> AppResult<String> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("Ticker must not be empty".into()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(AppError::Validation(format!(
            "Ticker {} is longer than {} characters",
            ticker, MAX_TICKER_LEN
        )));
    }
    let mut chars = ticker.chars();
    let starts_with_letter = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !starts_with_letter || !rest_ok {
        return Err(AppError::Validation(format!("Malformed ticker: {}", ticker)));
    }
    Ok(ticker)
}

/// Explicit share counts must be finite and positive
pub fn validate_shares(ticker: &str, shares: f64) -> AppResult<f64> {
    if !shares.is_finite() || shares <= 0.0 {
        return Err(AppError::Validation(format!(
            "Shares for {} must be a positive number",
            ticker
        )));
    }
    Ok(shares)
}

pub fn validate_budget(budget: Option<f64>) -> AppResult<Option<f64>> {
    match budget {
        Some(b) if !b.is_finite() || b <= 0.0 => Err(AppError::Validation(
            "Budget must be a positive number".into(),
        )),
        other => Ok(other),
    }
}

fn validate_size(size: usize) -> AppResult<()> {
    if !(MIN_PORTFOLIO_SIZE..=MAX_PORTFOLIO_SIZE).contains(&size) {
        return Err(AppError::Validation(format!(
            "Portfolio must hold between {} and {} stocks, got {}",
            MIN_PORTFOLIO_SIZE, MAX_PORTFOLIO_SIZE, size
        )));
    }
    Ok(())
}

/// Normalise a fresh portfolio: tickers uppercased, no duplicates, size within bounds
pub fn validate_picks(picks: &[Pick]) -> AppResult<Vec<Pick>> {
    validate_size(picks.len())?;

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(picks.len());
    for pick in picks {
        let ticker = normalize_ticker(&pick.ticker)?;
        if !seen.insert(ticker.clone()) {
            return Err(AppError::Validation(format!("Duplicate ticker: {}", ticker)));
        }
        let shares = match pick.shares {
            Some(s) => Some(validate_shares(&ticker, s)?),
            None => None,
        };
        normalized.push(Pick { ticker, shares });
    }
    Ok(normalized)
}

/// Apply `changes` to the tickers currently held and validate the result.
///
/// Runs before any price lookup or write, so an over-sized or conflicting
/// edit is rejected without side effects.
pub fn plan_edit(existing: &[String], changes: &[PortfolioChange]) -> AppResult<EditPlan> {
    if changes.is_empty() {
        return Err(AppError::Validation("No portfolio changes supplied".into()));
    }

    let mut tickers: Vec<String> = existing.to_vec();
    let mut plan = EditPlan::default();

    for change in changes {
        match change {
            PortfolioChange::Add { ticker, shares } => {
                let ticker = normalize_ticker(ticker)?;
                if tickers.contains(&ticker) {
                    return Err(AppError::Validation(format!(
                        "Duplicate ticker: {} is already in the portfolio",
                        ticker
                    )));
                }
                let shares = match shares {
                    Some(s) => Some(validate_shares(&ticker, *s)?),
                    None => None,
                };
                tickers.push(ticker.clone());
                plan.add.push(Pick { ticker, shares });
            }
            PortfolioChange::Remove { ticker } => {
                let ticker = normalize_ticker(ticker)?;
                let pos = tickers.iter().position(|t| *t == ticker).ok_or_else(|| {
                    AppError::Validation(format!("{} is not in the portfolio", ticker))
                })?;
                tickers.remove(pos);
                if let Some(added) = plan.add.iter().position(|p| p.ticker == ticker) {
                    plan.add.remove(added);
                } else {
                    plan.reweight.retain(|(t, _)| *t != ticker);
                    plan.remove.push(ticker);
                }
            }
            PortfolioChange::Reweight { ticker, shares } => {
                let ticker = normalize_ticker(ticker)?;
                let shares = validate_shares(&ticker, *shares)?;
                if !tickers.contains(&ticker) {
                    return Err(AppError::Validation(format!(
                        "{} is not in the portfolio",
                        ticker
                    )));
                }
                if let Some(added) = plan.add.iter_mut().find(|p| p.ticker == ticker) {
                    added.shares = Some(shares);
                } else {
                    plan.reweight.retain(|(t, _)| *t != ticker);
                    plan.reweight.push((ticker, shares));
                }
            }
        }
    }

    validate_size(tickers.len())?;
    plan.resulting_tickers = tickers;
    Ok(plan)
}
