use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a competition is gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionMode {
    /// Picks are taken inside a live window and measured from the pick date
    Live,
    /// An already elapsed period entered after the fact; locked manually
    Backfill,
}

impl CompetitionMode {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "live" => Ok(CompetitionMode::Live),
            "backfill" => Ok(CompetitionMode::Backfill),
            _ => Err(format!("Invalid competition mode: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionMode::Live => "live",
            CompetitionMode::Backfill => "backfill",
        }
    }
}

/// Derived lifecycle state, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionStatus {
    Upcoming,
    Open,
    Locked,
}

impl CompetitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionStatus::Upcoming => "upcoming",
            CompetitionStatus::Open => "open",
            CompetitionStatus::Locked => "locked",
        }
    }
}

/// Competition model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Competition {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub pick_window_start: NaiveDateTime,
    pub pick_window_end: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub mode: String, // Stored as TEXT, use CompetitionMode enum for type safety
    pub finalized: bool,
    pub budget: Option<f64>,
}

impl Competition {
    /// Create a live competition with an explicit pick window
    pub fn new_live(
        name: String,
        pick_window_start: NaiveDateTime,
        pick_window_end: NaiveDateTime,
        budget: Option<f64>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: generate_slug(),
            name,
            pick_window_start,
            pick_window_end,
            created_at,
            mode: CompetitionMode::Live.as_str().to_string(),
            finalized: false,
            budget,
        }
    }

    /// Create a backfill competition starting at midnight UTC of `start_date`.
    ///
    /// The window closes at creation time: the period is already over.
    pub fn new_backfill(
        name: String,
        start_date: NaiveDate,
        budget: Option<f64>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: generate_slug(),
            name,
            pick_window_start: start_date.and_time(chrono::NaiveTime::MIN),
            pick_window_end: created_at,
            created_at,
            mode: CompetitionMode::Backfill.as_str().to_string(),
            finalized: false,
            budget,
        }
    }

    /// Get mode as an enum
    pub fn mode_enum(&self) -> CompetitionMode {
        CompetitionMode::from_str(&self.mode).unwrap_or(CompetitionMode::Live)
    }

    pub fn is_backfill(&self) -> bool {
        self.mode_enum() == CompetitionMode::Backfill
    }

    /// Date whose close price is the baseline for backfill picks
    pub fn start_date(&self) -> NaiveDate {
        self.pick_window_start.date()
    }
}

/// Short public code used in shareable links
pub fn generate_slug() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
