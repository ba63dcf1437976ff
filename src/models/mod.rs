//! Domain models for the stock-pick backend.
//!
//! Database-backed records plus the canonical portfolio input types.

pub mod audit_event;
pub mod competition;
pub mod participant;
pub mod portfolio;
pub mod portfolio_stock;
pub mod price_history;

// Re-export all models for convenient access
pub use audit_event::{AuditAction, AuditEvent};
pub use competition::{Competition, CompetitionMode, CompetitionStatus};
pub use participant::Participant;
pub use portfolio::{EditPlan, Pick, PortfolioChange};
pub use portfolio_stock::PortfolioStock;
pub use price_history::PriceHistorySample;
