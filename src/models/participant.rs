use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named entrant in one competition
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub name: String,
    /// Weighted aggregate of the portfolio, null until priced
    pub percent_change: Option<f64>,
    /// Mirrors the first stock of the portfolio; display only
    pub primary_ticker: Option<String>,
    pub joined_at: NaiveDateTime,
}

impl Participant {
    pub fn new(competition_id: Uuid, name: String, joined_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            competition_id,
            name,
            percent_change: None,
            primary_ticker: None,
            joined_at,
        }
    }

    /// Case-insensitive name comparison used for uniqueness and lookups
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}
