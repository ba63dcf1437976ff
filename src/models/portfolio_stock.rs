use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One holding in a participant's portfolio
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioStock {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub ticker: String,
    pub shares: f64,
    /// Null until assigned
    pub baseline_price: Option<f64>,
    pub current_price: Option<f64>,
    pub percent_change: Option<f64>,
    pub updated_at: NaiveDateTime,
}

impl PortfolioStock {
    pub fn new(
        participant_id: Uuid,
        ticker: String,
        shares: f64,
        baseline_price: Option<f64>,
        current_price: Option<f64>,
        updated_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant_id,
            ticker,
            shares,
            baseline_price,
            current_price,
            percent_change: crate::valuation::stock_percent_change(baseline_price, current_price),
            updated_at,
        }
    }

    /// Dollar value at baseline; zero while the baseline is unknown
    pub fn initial_investment(&self) -> f64 {
        self.shares * self.baseline_price.unwrap_or(0.0)
    }
}
