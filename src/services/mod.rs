pub mod audit;
pub mod competition_service;
pub mod portfolio_service;
pub mod refresh;

pub use audit::AuditTrailService;
pub use competition_service::{
    rank_leaderboard, CompetitionDetail, CompetitionService, CompetitionWindow, LeaderboardEntry,
};
pub use portfolio_service::{ParticipantPortfolio, PortfolioService};
pub use refresh::{PriceRefresher, RefreshReport};
