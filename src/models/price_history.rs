use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Price observation appended on every successful fetch during refresh
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceHistorySample {
    pub id: Uuid,
    pub ticker: String,
    pub price: f64,
    pub recorded_at: NaiveDateTime,
}

impl PriceHistorySample {
    pub fn new(ticker: String, price: f64, recorded_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker,
            price,
            recorded_at,
        }
    }
}
