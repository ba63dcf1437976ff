use crate::clock::Clock;
use crate::error::AppResult;
use crate::models::{AuditAction, AuditEvent, Competition, Participant, PortfolioChange, PortfolioStock};
use crate::repositories::AuditRepository;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Audit trail service for logging every state-changing action
pub struct AuditTrailService {
    repo: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditTrailService {
    pub fn new(repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Persist an audit entry
    pub async fn log(&self, event: AuditEvent) -> AppResult<()> {
        self.repo.append(&event).await?;
        info!(
            competition_id = %event.competition_id,
            action = %event.action,
            actor = %event.actor,
            "audit"
        );
        Ok(())
    }

    /// Record an action that has already happened. A failure here must not
    /// undo the action, so it is only logged.
    async fn record(
        &self,
        competition_id: Uuid,
        action: AuditAction,
        actor: &str,
        details: serde_json::Value,
    ) {
        let event = AuditEvent::new(
            competition_id,
            action,
            actor.to_string(),
            details,
            self.clock.now(),
        );
        if let Err(e) = self.log(event).await {
            warn!(
                "Failed to write {} audit entry for competition {}: {}",
                action.as_str(),
                competition_id,
                e
            );
        }
    }

    pub async fn log_competition_created(&self, competition: &Competition) {
        self.record(
            competition.id,
            AuditAction::Create,
            "system",
            serde_json::json!({
                "slug": competition.slug,
                "name": competition.name,
                "mode": competition.mode,
                "pick_window_start": competition.pick_window_start,
                "pick_window_end": competition.pick_window_end,
                "budget": competition.budget,
            }),
        )
        .await
    }

    pub async fn log_joined(
        &self,
        competition: &Competition,
        participant: &Participant,
        stocks: &[PortfolioStock],
    ) {
        let picks: Vec<_> = stocks
            .iter()
            .map(|s| {
                serde_json::json!({
                    "ticker": s.ticker,
                    "shares": s.shares,
                    "baseline_price": s.baseline_price,
                })
            })
            .collect();

        self.record(
            competition.id,
            AuditAction::Join,
            &participant.name,
            serde_json::json!({ "participant_id": participant.id, "stocks": picks }),
        )
        .await
    }

    pub async fn log_portfolio_edited(
        &self,
        competition: &Competition,
        participant: &Participant,
        changes: &[PortfolioChange],
    ) {
        self.record(
            competition.id,
            AuditAction::Edit,
            &participant.name,
            serde_json::json!({ "participant_id": participant.id, "changes": changes }),
        )
        .await
    }

    pub async fn log_left(&self, competition: &Competition, participant: &Participant) {
        self.record(
            competition.id,
            AuditAction::Leave,
            &participant.name,
            serde_json::json!({ "participant_id": participant.id }),
        )
        .await
    }

    pub async fn log_finalized(&self, competition: &Competition, actor: &str) {
        self.record(
            competition.id,
            AuditAction::Lock,
            actor,
            serde_json::json!({ "finalized": true }),
        )
        .await
    }

    pub async fn log_unfinalized(&self, competition: &Competition, actor: &str) {
        self.record(
            competition.id,
            AuditAction::Unlock,
            actor,
            serde_json::json!({ "finalized": false }),
        )
        .await
    }
}
